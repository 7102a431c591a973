//! Server binary: settings from env, backend from `DATABASE_URL`, then the project API.

use projectbase::{
    app, ensure_database_exists, ensure_tables, seed_reference_data, AppState, Backend, MemoryProvider, PgProvider,
    ProjectManager, Settings,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("projectbase=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = Settings::from_env()?;
    let state = match &settings.backend {
        Backend::Postgres(url) => {
            ensure_database_exists(url).await?;
            let provider = PgProvider::connect_lazy(url, settings.max_connections, settings.match_mode)?;
            ensure_tables(provider.pool()).await?;
            seed_reference_data(&provider).await?;
            tracing::info!(backend = "postgres", max_connections = settings.max_connections, "data store ready");
            AppState::new(ProjectManager::new(provider))
        }
        Backend::Memory => {
            let provider = MemoryProvider::new(settings.match_mode);
            seed_reference_data(&provider).await?;
            tracing::info!(backend = "memory", "data store ready");
            AppState::new(ProjectManager::new(provider))
        }
    };

    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state, settings.body_limit)).await?;
    Ok(())
}
