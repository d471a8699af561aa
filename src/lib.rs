//! Blog API: users and posts over HTTP, backed by PostgreSQL or an in-memory store.

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod models;
pub mod response;
pub mod routes;
pub mod seed;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use app::app;
pub use config::{validate, AppConfig, DatabaseProfile, Environment, Resource, POSTS, RESOURCES, USERS};
pub use error::{AppError, ConfigError, StoreError};
pub use migration::{migrate_latest, migrate_rollback, migration_status, MigrationError, MigrationStatus};
pub use models::{Post, User};
pub use routes::{common_routes, demo_routes, resource_routes};
pub use seed::{run_seeds, SeedError, SeedOptions, SeedSummary};
pub use service::CrudService;
pub use state::AppState;
pub use store::{connect, ensure_database_exists, MemoryStore, PgStore, Store};
