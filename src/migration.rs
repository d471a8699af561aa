//! Embedded schema migrations for PostgreSQL.
//!
//! Each migration has an `up` and a `down` script embedded at compile time.
//! Applied migrations are tracked in `_blog_migrations`, grouped into batches:
//! one `migrate_latest` run forms one batch, and `migrate_rollback` reverts the
//! most recent batch.

use sqlx::PgPool;
use thiserror::Error;

/// A single embedded migration.
pub struct Migration {
    pub name: &'static str,
    up: &'static str,
    down: &'static str,
}

/// All migrations, strictly ascending by name.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "20241210182355_users",
        up: include_str!("../migrations/20241210182355_users.up.sql"),
        down: include_str!("../migrations/20241210182355_users.down.sql"),
    },
    Migration {
        name: "20241210190654_posts",
        up: include_str!("../migrations/20241210190654_posts.up.sql"),
        down: include_str!("../migrations/20241210190654_posts.down.sql"),
    },
];

const TRACKING_TABLE_DDL: &str = "CREATE TABLE IF NOT EXISTS _blog_migrations (
    id SERIAL PRIMARY KEY,
    name VARCHAR(255) NOT NULL UNIQUE,
    batch INTEGER NOT NULL,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)";

#[derive(Debug, Error)]
pub enum MigrationError {
    /// A script or its tracking statement failed.
    #[error("migration '{name}' failed: {source}")]
    ExecutionFailed { name: String, source: sqlx::Error },

    #[error("failed to check migration state: {0}")]
    StateQuery(sqlx::Error),

    #[error("migration '{next}' must sort after '{previous}'")]
    OutOfOrder { previous: String, next: String },
}

/// One row of `migration_status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub name: &'static str,
    /// Batch number when applied.
    pub batch: Option<i32>,
}

impl MigrationStatus {
    pub fn is_applied(&self) -> bool {
        self.batch.is_some()
    }
}

/// Reject a migration list that is not strictly ascending by name.
pub fn validate_order(migrations: &[Migration]) -> Result<(), MigrationError> {
    for pair in migrations.windows(2) {
        if pair[0].name >= pair[1].name {
            return Err(MigrationError::OutOfOrder {
                previous: pair[0].name.to_string(),
                next: pair[1].name.to_string(),
            });
        }
    }
    Ok(())
}

async fn ensure_tracking_table(pool: &PgPool) -> Result<(), MigrationError> {
    sqlx::query(TRACKING_TABLE_DDL)
        .execute(pool)
        .await
        .map_err(|source| MigrationError::ExecutionFailed {
            name: "_blog_migrations_bootstrap".to_string(),
            source,
        })?;
    Ok(())
}

async fn applied(pool: &PgPool) -> Result<Vec<(String, i32)>, MigrationError> {
    sqlx::query_as::<_, (String, i32)>("SELECT name, batch FROM _blog_migrations ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(MigrationError::StateQuery)
}

/// Apply every pending migration under one new batch. Returns the applied names.
pub async fn migrate_latest(pool: &PgPool) -> Result<Vec<&'static str>, MigrationError> {
    run_latest(pool, MIGRATIONS).await
}

async fn run_latest(pool: &PgPool, migrations: &'static [Migration]) -> Result<Vec<&'static str>, MigrationError> {
    validate_order(migrations)?;
    ensure_tracking_table(pool).await?;

    let done = applied(pool).await?;
    let batch = done.iter().map(|(_, b)| *b).max().unwrap_or(0) + 1;
    let mut names = Vec::new();

    for migration in migrations {
        if done.iter().any(|(n, _)| n == migration.name) {
            tracing::debug!(migration = migration.name, "migration already applied, skipping");
            continue;
        }
        tracing::info!(migration = migration.name, batch, "applying migration");
        let failed = |source| MigrationError::ExecutionFailed {
            name: migration.name.to_string(),
            source,
        };

        let mut tx = pool.begin().await.map_err(failed)?;
        sqlx::raw_sql(migration.up).execute(&mut *tx).await.map_err(failed)?;
        sqlx::query("INSERT INTO _blog_migrations (name, batch) VALUES ($1, $2)")
            .bind(migration.name)
            .bind(batch)
            .execute(&mut *tx)
            .await
            .map_err(failed)?;
        tx.commit().await.map_err(failed)?;
        names.push(migration.name);
    }

    if names.is_empty() {
        tracing::info!("already up to date");
    }
    Ok(names)
}

/// Revert the most recent batch in reverse order. Returns the reverted names.
pub async fn migrate_rollback(pool: &PgPool) -> Result<Vec<&'static str>, MigrationError> {
    validate_order(MIGRATIONS)?;
    ensure_tracking_table(pool).await?;

    let done = applied(pool).await?;
    let Some(last) = done.iter().map(|(_, b)| *b).max() else {
        tracing::info!("nothing to roll back");
        return Ok(Vec::new());
    };
    let mut names = Vec::new();

    for migration in MIGRATIONS.iter().rev() {
        if !done.iter().any(|(n, b)| n == migration.name && *b == last) {
            continue;
        }
        tracing::info!(migration = migration.name, batch = last, "reverting migration");
        let failed = |source| MigrationError::ExecutionFailed {
            name: migration.name.to_string(),
            source,
        };

        let mut tx = pool.begin().await.map_err(failed)?;
        sqlx::raw_sql(migration.down).execute(&mut *tx).await.map_err(failed)?;
        sqlx::query("DELETE FROM _blog_migrations WHERE name = $1")
            .bind(migration.name)
            .execute(&mut *tx)
            .await
            .map_err(failed)?;
        tx.commit().await.map_err(failed)?;
        names.push(migration.name);
    }
    Ok(names)
}

/// Every known migration with its batch, if applied.
pub async fn migration_status(pool: &PgPool) -> Result<Vec<MigrationStatus>, MigrationError> {
    ensure_tracking_table(pool).await?;
    let done = applied(pool).await?;
    Ok(MIGRATIONS
        .iter()
        .map(|m| MigrationStatus {
            name: m.name,
            batch: done.iter().find(|(n, _)| n == m.name).map(|(_, b)| *b),
        })
        .collect())
}
