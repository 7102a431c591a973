//! Schema bootstrap for the PostgreSQL backend and reference-data seeding for any backend.

use crate::error::DataError;
use crate::models::{Priority, ProjectCategory, Status, TaskType};
use crate::repository::{ConnectionProvider, Repository};
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;

/// Parent tables first so foreign keys resolve.
const DDL: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        avatar TEXT,
        phone_number TEXT,
        access_token TEXT UNIQUE
    )"#,
    r#"CREATE TABLE IF NOT EXISTS project_category (
        id BIGSERIAL PRIMARY KEY,
        project_category_name TEXT NOT NULL UNIQUE
    )"#,
    r#"CREATE TABLE IF NOT EXISTS project (
        id BIGSERIAL PRIMARY KEY,
        project_name TEXT NOT NULL,
        description TEXT,
        category_id BIGINT NOT NULL REFERENCES project_category(id),
        alias TEXT NOT NULL,
        creator BIGINT REFERENCES users(id),
        deleted BOOLEAN NOT NULL DEFAULT FALSE
    )"#,
    r#"CREATE TABLE IF NOT EXISTS project_user (
        id BIGSERIAL PRIMARY KEY,
        project_id BIGINT NOT NULL REFERENCES project(id),
        user_id BIGINT NOT NULL REFERENCES users(id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS status (
        status_id TEXT PRIMARY KEY,
        status_name TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS priority (
        priority_id BIGSERIAL PRIMARY KEY,
        priority TEXT NOT NULL UNIQUE,
        description TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS task_type (
        id BIGSERIAL PRIMARY KEY,
        task_type TEXT NOT NULL UNIQUE
    )"#,
    r#"CREATE TABLE IF NOT EXISTS task (
        task_id BIGSERIAL PRIMARY KEY,
        task_name TEXT NOT NULL,
        description TEXT,
        status_id TEXT NOT NULL REFERENCES status(status_id),
        priority_id BIGINT NOT NULL REFERENCES priority(priority_id),
        type_id BIGINT NOT NULL REFERENCES task_type(id),
        project_id BIGINT NOT NULL REFERENCES project(id),
        reporter_id BIGINT REFERENCES users(id),
        original_estimate BIGINT NOT NULL DEFAULT 0,
        time_tracking_spent BIGINT NOT NULL DEFAULT 0,
        time_tracking_remaining BIGINT NOT NULL DEFAULT 0,
        deleted BOOLEAN NOT NULL DEFAULT FALSE
    )"#,
    r#"CREATE TABLE IF NOT EXISTS task_user (
        id BIGSERIAL PRIMARY KEY,
        task_id BIGINT NOT NULL REFERENCES task(task_id),
        user_id BIGINT NOT NULL REFERENCES users(id)
    )"#,
];

const STATUSES: &[(&str, &str)] = &[
    ("1", "BACKLOG"),
    ("2", "SELECTED FOR DEVELOPMENT"),
    ("3", "IN PROGRESS"),
    ("4", "DONE"),
];
const PRIORITIES: &[&str] = &["High", "Medium", "Low", "Lowest"];
const TASK_TYPES: &[&str] = &["bug", "new task"];
const CATEGORIES: &[&str] = &["Web project", "Software project", "Mobile project"];

/// Creates every table the API uses. Idempotent.
pub async fn ensure_tables(pool: &PgPool) -> Result<(), DataError> {
    for ddl in DDL {
        sqlx::query(ddl).execute(pool).await?;
    }
    tracing::info!(tables = DDL.len(), "schema ensured");
    Ok(())
}

/// Inserts statuses, priorities, task types and project categories that are not present yet.
pub async fn seed_reference_data<P>(provider: &P) -> Result<(), DataError>
where
    P: ConnectionProvider + Clone,
{
    let statuses: Repository<Status, P> = Repository::new(provider.clone());
    for (id, name) in STATUSES {
        if !statuses.check_valid_by_condition("status_id", *id).await? {
            statuses
                .insert(Status {
                    status_id: id.to_string(),
                    status_name: name.to_string(),
                })
                .await?;
        }
    }

    let priorities: Repository<Priority, P> = Repository::new(provider.clone());
    for name in PRIORITIES {
        if !priorities.check_valid_by_condition("priority", *name).await? {
            priorities
                .insert(Priority {
                    priority_id: 0,
                    priority: name.to_string(),
                    description: Some(name.to_string()),
                })
                .await?;
        }
    }

    let types: Repository<TaskType, P> = Repository::new(provider.clone());
    for name in TASK_TYPES {
        if !types.check_valid_by_condition("task_type", *name).await? {
            types
                .insert(TaskType {
                    id: 0,
                    task_type: name.to_string(),
                })
                .await?;
        }
    }

    let categories: Repository<ProjectCategory, P> = Repository::new(provider.clone());
    for name in CATEGORIES {
        if !categories.check_valid_by_condition("project_category_name", *name).await? {
            categories
                .insert(ProjectCategory {
                    id: 0,
                    project_category_name: name.to_string(),
                })
                .await?;
        }
    }
    Ok(())
}

/// Connects to the server's `postgres` database and creates the target database if missing.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), DataError> {
    let Some((admin_url, db_name)) = split_db_name(database_url) else {
        return Ok(());
    };
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE \"{}\"", db_name.replace('"', "\"\"")))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

/// `postgres://host/name?x` -> (`postgres://host/postgres?x`, `name`).
fn split_db_name(url: &str) -> Option<(String, String)> {
    let rest = url.split_once("://")?.1;
    let slash = url.len() - rest.len() + rest.find('/')?;
    let (base, path) = url.split_at(slash + 1);
    let (name, query) = match path.split_once('?') {
        Some((name, query)) => (name, format!("?{}", query)),
        None => (path, String::new()),
    };
    Some((format!("{}postgres{}", base, query), name.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryProvider;

    #[test]
    fn admin_url_keeps_query() {
        assert_eq!(
            split_db_name("postgres://u:p@localhost:5432/projectbase?sslmode=disable"),
            Some((
                "postgres://u:p@localhost:5432/postgres?sslmode=disable".to_string(),
                "projectbase".to_string()
            ))
        );
        assert_eq!(split_db_name("postgres://localhost"), None);
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let provider = MemoryProvider::default();
        seed_reference_data(&provider).await.unwrap();
        seed_reference_data(&provider).await.unwrap();
        assert_eq!(provider.rows("status").len(), STATUSES.len());
        assert_eq!(provider.rows("priority").len(), PRIORITIES.len());
        assert_eq!(provider.rows("task_type").len(), TASK_TYPES.len());
        assert_eq!(provider.rows("project_category").len(), CATEGORIES.len());
        assert_eq!(provider.open_connections(), 0);
    }
}
