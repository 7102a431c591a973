//! projectbase: generic procedure-backed repository with a project/task management REST API.

pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;

pub use entity::{ColumnPair, ColumnSet, Entity, Field, FieldKind, TableSchema};
pub use error::{AppError, ConfigError, DataError};
pub use repository::{
    ConnectionProvider, Filter, MatchMode, MemoryProvider, PagingResult, PgProvider, ProcedureConnection, Repository,
};
pub use response::ResponseEntity;
pub use routes::{app, common_routes, project_routes};
pub use service::{ProjectManager, ProjectService};
pub use settings::{Backend, Settings};
pub use sql::SqlValue;
pub use state::AppState;
pub use store::{ensure_database_exists, ensure_tables, seed_reference_data};
