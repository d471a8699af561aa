//! Data access layer: the `Store` trait and its PostgreSQL and in-memory backends.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgStore};

use crate::config::{DatabaseProfile, Resource, RESOURCES};
use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// One table row as a JSON object keyed by column name.
pub type Row = Map<String, Value>;

/// Single-statement operations over a resource's table. Every call is one
/// round trip; there is no cross-call transaction.
#[async_trait]
pub trait Store: Send + Sync {
    /// Every row, ordered by id.
    async fn list(&self, resource: &'static Resource) -> Result<Vec<Row>, StoreError>;

    async fn find(&self, resource: &'static Resource, id: i64) -> Result<Option<Row>, StoreError>;

    /// Insert one row and return it as stored, with id and defaults filled in.
    async fn insert(&self, resource: &'static Resource, values: &Row) -> Result<Row, StoreError>;

    /// Set the given columns on the row with `id`. `None` when no row matches.
    async fn update(
        &self,
        resource: &'static Resource,
        id: i64,
        values: &Row,
    ) -> Result<Option<Row>, StoreError>;

    /// Delete the row with `id`; returns the number of rows removed.
    async fn delete(&self, resource: &'static Resource, id: i64) -> Result<u64, StoreError>;

    async fn delete_all(&self, resource: &'static Resource) -> Result<u64, StoreError>;

    /// Insert all rows in one statement; returns the number inserted.
    async fn insert_many(&self, resource: &'static Resource, rows: &[Row]) -> Result<u64, StoreError>;

    /// Every id in the table, ordered.
    async fn pluck_ids(&self, resource: &'static Resource) -> Result<Vec<i64>, StoreError>;

    /// Cheap round trip for readiness checks.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Open the store a profile describes. PostgreSQL databases are created when missing.
pub async fn connect(profile: &DatabaseProfile) -> Result<Arc<dyn Store>, StoreError> {
    match profile {
        DatabaseProfile::Memory => {
            tracing::info!("using in-memory store");
            Ok(Arc::new(MemoryStore::new(&RESOURCES)))
        }
        DatabaseProfile::Postgres {
            url,
            max_connections,
        } => {
            ensure_database_exists(url).await?;
            let store = PgStore::connect(url, *max_connections).await?;
            tracing::info!(max_connections = *max_connections, "connected to postgres");
            Ok(Arc::new(store))
        }
    }
}
