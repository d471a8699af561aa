//! Convert serde_json::Value to typed values that sqlx can bind, per column kind.

use crate::config::{Column, ColumnKind, Resource};
use crate::error::StoreError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

/// A value coerced to its column's storage type. `None` binds SQL NULL of that type.
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    Int(Option<i64>),
    Text(Option<String>),
    Timestamp(Option<DateTime<Utc>>),
}

impl BindValue {
    pub fn for_column(column: &Column, v: &Value) -> Result<Self, StoreError> {
        let invalid = |reason: &str| StoreError::InvalidValue {
            column: column.name.to_string(),
            reason: reason.to_string(),
        };
        Ok(match column.kind {
            ColumnKind::Serial | ColumnKind::Integer => BindValue::Int(match v {
                Value::Null => None,
                Value::Number(n) => Some(n.as_i64().ok_or_else(|| invalid("not an integer"))?),
                Value::String(s) => Some(
                    s.trim()
                        .parse::<i64>()
                        .map_err(|_| invalid("not an integer"))?,
                ),
                _ => return Err(invalid("expected an integer")),
            }),
            ColumnKind::String | ColumnKind::Text => BindValue::Text(match v {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => return Err(invalid("expected a string")),
            }),
            ColumnKind::Timestamp => BindValue::Timestamp(match v {
                Value::Null => None,
                Value::String(s) => Some(parse_timestamp(s).ok_or_else(|| invalid("not an RFC 3339 timestamp"))?),
                _ => return Err(invalid("expected a timestamp string")),
            }),
        })
    }

    /// JSON form as returned to clients.
    pub fn to_json(&self) -> Value {
        match self {
            BindValue::Int(Some(n)) => Value::Number((*n).into()),
            BindValue::Text(Some(s)) => Value::String(s.clone()),
            BindValue::Timestamp(Some(t)) => Value::String(format_timestamp(t)),
            BindValue::Int(None) | BindValue::Text(None) | BindValue::Timestamp(None) => Value::Null,
        }
    }

    pub fn bind<'q>(
        self,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Query<'q, Postgres, PgArguments> {
        match self {
            BindValue::Int(n) => query.bind(n),
            BindValue::Text(s) => query.bind(s),
            BindValue::Timestamp(t) => query.bind(t),
        }
    }
}

/// Coerce the row's values for known columns, in column order. Unknown keys are ignored.
pub fn coerce_row(
    resource: &'static Resource,
    row: &Map<String, Value>,
) -> Result<Vec<(&'static Column, BindValue)>, StoreError> {
    resource
        .columns
        .iter()
        .filter_map(|c| row.get(c.name).map(|v| (c, v)))
        .map(|(c, v)| BindValue::for_column(c, v).map(|b| (c, b)))
        .collect()
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// `2024-12-10T18:23:55.123Z`
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now_timestamp() -> Value {
    Value::String(format_timestamp(&Utc::now()))
}
