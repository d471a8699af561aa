//! In-memory backend with the same constraint behavior as the PostgreSQL schema:
//! serial ids, timestamp defaults, unique columns, and foreign keys that reject
//! dangling references on write and referenced rows on delete.

use super::{Row, Store};
use crate::config::{ColumnKind, Resource, ID_COLUMN};
use crate::error::StoreError;
use crate::sql::{coerce_row, now_timestamp};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Clone, Debug)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, Row>,
}

impl Default for Table {
    fn default() -> Self {
        Table {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

type Tables = HashMap<&'static str, Table>;

pub struct MemoryStore {
    resources: Vec<&'static Resource>,
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// One empty table per resource.
    pub fn new(resources: &[&'static Resource]) -> Self {
        let tables = resources.iter().map(|r| (r.table, Table::default())).collect();
        MemoryStore {
            resources: resources.to_vec(),
            tables: RwLock::new(tables),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rows elsewhere whose foreign key points at `id` in `resource`'s table.
    fn referencing(&self, tables: &Tables, resource: &Resource, id: i64) -> Option<String> {
        for other in &self.resources {
            for c in other.columns.iter().filter(|c| c.references == Some(resource.table)) {
                let Some(table) = tables.get(other.table) else { continue };
                if table
                    .rows
                    .values()
                    .any(|r| r.get(c.name).and_then(Value::as_i64) == Some(id))
                {
                    return Some(format!("{}_{}_foreign", other.table, c.name));
                }
            }
        }
        None
    }
}

fn table<'a>(tables: &'a Tables, resource: &Resource) -> Result<&'a Table, StoreError> {
    tables
        .get(resource.table)
        .ok_or_else(|| StoreError::UnknownTable(resource.table.to_string()))
}

fn table_mut<'a>(tables: &'a mut Tables, resource: &Resource) -> Result<&'a mut Table, StoreError> {
    tables
        .get_mut(resource.table)
        .ok_or_else(|| StoreError::UnknownTable(resource.table.to_string()))
}

/// Full row for an insert: given values, timestamp defaults, NULL elsewhere.
fn new_row(resource: &'static Resource, id: i64, values: &Row) -> Result<Row, StoreError> {
    let given: HashMap<&str, Value> = coerce_row(resource, values)?
        .into_iter()
        .map(|(c, v)| (c.name, v.to_json()))
        .collect();
    let mut row = Row::new();
    for c in resource.columns {
        let v = if c.name == ID_COLUMN {
            Value::Number(id.into())
        } else if let Some(v) = given.get(c.name) {
            v.clone()
        } else if c.kind == ColumnKind::Timestamp {
            now_timestamp()
        } else {
            Value::Null
        };
        row.insert(c.name.to_string(), v);
    }
    Ok(row)
}

fn apply(resource: &'static Resource, row: &mut Row, values: &Row) -> Result<(), StoreError> {
    for (c, v) in coerce_row(resource, values)? {
        if c.name != ID_COLUMN {
            row.insert(c.name.to_string(), v.to_json());
        }
    }
    Ok(())
}

fn check_unique(resource: &Resource, own: &Table, row: &Row, id: i64) -> Result<(), StoreError> {
    for c in resource.columns.iter().filter(|c| c.unique) {
        let v = match row.get(c.name) {
            Some(Value::Null) | None => continue,
            Some(v) => v,
        };
        if own
            .rows
            .iter()
            .any(|(other_id, other)| *other_id != id && other.get(c.name) == Some(v))
        {
            return Err(StoreError::UniqueViolation {
                table: resource.table.to_string(),
                detail: format!("{}_{}_unique", resource.table, c.name),
            });
        }
    }
    Ok(())
}

fn check_references(tables: &Tables, resource: &Resource, row: &Row) -> Result<(), StoreError> {
    for c in resource.columns {
        let Some(target) = c.references else { continue };
        let Some(id) = row.get(c.name).and_then(Value::as_i64) else { continue };
        let exists = tables
            .get(target)
            .map(|t| t.rows.contains_key(&id))
            .unwrap_or(false);
        if !exists {
            return Err(StoreError::ForeignKeyViolation {
                table: resource.table.to_string(),
                detail: format!("{}_{}_foreign", resource.table, c.name),
            });
        }
    }
    Ok(())
}

/// Build and check the next row for `own` without writing it.
fn prepare(
    tables: &Tables,
    own: &Table,
    resource: &'static Resource,
    values: &Row,
) -> Result<(i64, Row), StoreError> {
    let id = own.next_id;
    let row = new_row(resource, id, values)?;
    check_unique(resource, own, &row, id)?;
    check_references(tables, resource, &row)?;
    Ok((id, row))
}

fn commit(own: &mut Table, id: i64, row: Row) {
    own.rows.insert(id, row);
    own.next_id = id + 1;
}

#[async_trait]
impl Store for MemoryStore {
    async fn list(&self, resource: &'static Resource) -> Result<Vec<Row>, StoreError> {
        let tables = self.read();
        Ok(table(&tables, resource)?.rows.values().cloned().collect())
    }

    async fn find(&self, resource: &'static Resource, id: i64) -> Result<Option<Row>, StoreError> {
        let tables = self.read();
        Ok(table(&tables, resource)?.rows.get(&id).cloned())
    }

    async fn insert(&self, resource: &'static Resource, values: &Row) -> Result<Row, StoreError> {
        let mut tables = self.write();
        let (id, row) = prepare(&tables, table(&tables, resource)?, resource, values)?;
        commit(table_mut(&mut tables, resource)?, id, row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        resource: &'static Resource,
        id: i64,
        values: &Row,
    ) -> Result<Option<Row>, StoreError> {
        let mut tables = self.write();
        let own = table(&tables, resource)?;
        let Some(current) = own.rows.get(&id) else {
            return Ok(None);
        };
        let mut row = current.clone();
        apply(resource, &mut row, values)?;
        check_unique(resource, own, &row, id)?;
        check_references(&tables, resource, &row)?;
        table_mut(&mut tables, resource)?.rows.insert(id, row.clone());
        Ok(Some(row))
    }

    async fn delete(&self, resource: &'static Resource, id: i64) -> Result<u64, StoreError> {
        let mut tables = self.write();
        if !table(&tables, resource)?.rows.contains_key(&id) {
            return Ok(0);
        }
        if let Some(detail) = self.referencing(&tables, resource, id) {
            return Err(StoreError::ForeignKeyViolation {
                table: resource.table.to_string(),
                detail,
            });
        }
        table_mut(&mut tables, resource)?.rows.remove(&id);
        Ok(1)
    }

    async fn delete_all(&self, resource: &'static Resource) -> Result<u64, StoreError> {
        let mut tables = self.write();
        let ids: Vec<i64> = table(&tables, resource)?.rows.keys().copied().collect();
        for id in &ids {
            if let Some(detail) = self.referencing(&tables, resource, *id) {
                return Err(StoreError::ForeignKeyViolation {
                    table: resource.table.to_string(),
                    detail,
                });
            }
        }
        table_mut(&mut tables, resource)?.rows.clear();
        Ok(ids.len() as u64)
    }

    async fn insert_many(&self, resource: &'static Resource, rows: &[Row]) -> Result<u64, StoreError> {
        let mut tables = self.write();
        // staged so a failing row leaves the live table untouched
        let mut staged = table(&tables, resource)?.clone();
        for values in rows {
            let (id, row) = prepare(&tables, &staged, resource, values)?;
            commit(&mut staged, id, row);
        }
        *table_mut(&mut tables, resource)? = staged;
        Ok(rows.len() as u64)
    }

    async fn pluck_ids(&self, resource: &'static Resource) -> Result<Vec<i64>, StoreError> {
        let tables = self.read();
        Ok(table(&tables, resource)?.rows.keys().copied().collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
