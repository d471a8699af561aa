//! PostgreSQL backend: statements from the SQL builder, rows decoded per column kind.

use super::{Row, Store};
use crate::config::{ColumnKind, Resource, ID_COLUMN};
use crate::error::StoreError;
use crate::sql::{self, coerce_row, format_timestamp, QueryBuf};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{ConnectOptions, PgPool, Row as _};
use std::str::FromStr;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_all(&self, resource: &Resource, q: QueryBuf) -> Result<Vec<Row>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in q.params {
            query = p.bind(query);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| classify(resource, e))?;
        rows.iter().map(|r| row_to_json(resource, r)).collect()
    }

    async fn fetch_optional(&self, resource: &Resource, q: QueryBuf) -> Result<Option<Row>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in q.params {
            query = p.bind(query);
        }
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(resource, e))?;
        row.map(|r| row_to_json(resource, &r)).transpose()
    }

    async fn execute(&self, resource: &Resource, q: QueryBuf) -> Result<u64, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
        let mut query = sqlx::query(&q.sql);
        for p in q.params {
            query = p.bind(query);
        }
        let done = query
            .execute(&self.pool)
            .await
            .map_err(|e| classify(resource, e))?;
        Ok(done.rows_affected())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn list(&self, resource: &'static Resource) -> Result<Vec<Row>, StoreError> {
        self.fetch_all(resource, sql::select_all(resource)).await
    }

    async fn find(&self, resource: &'static Resource, id: i64) -> Result<Option<Row>, StoreError> {
        self.fetch_optional(resource, sql::select_by_id(resource, id)).await
    }

    async fn insert(&self, resource: &'static Resource, values: &Row) -> Result<Row, StoreError> {
        let q = sql::insert(resource, coerce_row(resource, values)?);
        self.fetch_optional(resource, q)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
    }

    async fn update(
        &self,
        resource: &'static Resource,
        id: i64,
        values: &Row,
    ) -> Result<Option<Row>, StoreError> {
        let q = sql::update(resource, id, coerce_row(resource, values)?);
        self.fetch_optional(resource, q).await
    }

    async fn delete(&self, resource: &'static Resource, id: i64) -> Result<u64, StoreError> {
        self.execute(resource, sql::delete(resource, id)).await
    }

    async fn delete_all(&self, resource: &'static Resource) -> Result<u64, StoreError> {
        self.execute(resource, sql::delete_all(resource)).await
    }

    async fn insert_many(&self, resource: &'static Resource, rows: &[Row]) -> Result<u64, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let coerced = rows
            .iter()
            .map(|r| coerce_row(resource, r))
            .collect::<Result<Vec<_>, _>>()?;
        let batches = sql::insert_many_batches(resource, coerced);

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for q in batches {
            tracing::debug!(sql_len = q.sql.len(), params = q.params.len(), "bulk insert batch");
            let mut query = sqlx::query(&q.sql);
            for p in q.params {
                query = p.bind(query);
            }
            let done = query
                .execute(&mut *tx)
                .await
                .map_err(|e| classify(resource, e))?;
            inserted += done.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn pluck_ids(&self, resource: &'static Resource) -> Result<Vec<i64>, StoreError> {
        let q = sql::pluck(resource, ID_COLUMN);
        tracing::debug!(sql = %q.sql, "query");
        let ids: Vec<i32> = sqlx::query_scalar(&q.sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| classify(resource, e))?;
        Ok(ids.into_iter().map(i64::from).collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Split constraint failures out of generic database errors so logs say what broke.
fn classify(resource: &Resource, e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        let detail = db.constraint().unwrap_or_else(|| db.message()).to_string();
        if db.is_unique_violation() {
            return StoreError::UniqueViolation {
                table: resource.table.to_string(),
                detail,
            };
        }
        if db.is_foreign_key_violation() {
            return StoreError::ForeignKeyViolation {
                table: resource.table.to_string(),
                detail,
            };
        }
    }
    StoreError::Database(e)
}

fn row_to_json(resource: &Resource, row: &PgRow) -> Result<Row, StoreError> {
    let mut map = Row::new();
    for c in resource.columns {
        let v = match c.kind {
            ColumnKind::Serial | ColumnKind::Integer => row
                .try_get::<Option<i32>, _>(c.name)?
                .map(|n| Value::Number(n.into())),
            ColumnKind::String | ColumnKind::Text => {
                row.try_get::<Option<String>, _>(c.name)?.map(Value::String)
            }
            ColumnKind::Timestamp => row
                .try_get::<Option<DateTime<Utc>>, _>(c.name)?
                .map(|t| Value::String(format_timestamp(&t))),
        };
        map.insert(c.name.to_string(), v.unwrap_or(Value::Null));
    }
    Ok(map)
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), StoreError> {
    let Some((admin_url, db_name)) = parse_db_name_from_url(database_url) else {
        return Ok(());
    };
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Option<(String, String)> {
    let scheme_end = url.find("://")? + 3;
    let path_start = scheme_end + url.get(scheme_end..)?.find('/')? + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    let query = path_and_query
        .find('?')
        .and_then(|i| path_and_query.get(i..))
        .unwrap_or("");
    Some((format!("{}postgres{}", base, query), db_name.to_string()))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
