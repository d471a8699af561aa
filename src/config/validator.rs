//! Resource validation: field lists and references must point at real columns and tables.

use crate::config::resource::{ColumnKind, Resource, ID_COLUMN};
use crate::error::ConfigError;
use std::collections::HashSet;

/// Validate a set of resources. Referenced tables must appear earlier in `resources`
/// than the tables referencing them, matching migration order.
pub fn validate(resources: &[&Resource]) -> Result<(), ConfigError> {
    let mut seen_tables: HashSet<&str> = HashSet::new();
    for r in resources {
        let err = |message: String| ConfigError::Resource {
            resource: r.table,
            message,
        };
        if !seen_tables.insert(r.table) {
            return Err(err("duplicate table".into()));
        }
        match r.column(ID_COLUMN) {
            Some(c) if c.kind == ColumnKind::Serial => {}
            _ => return Err(err(format!("'{}' must be a serial column", ID_COLUMN))),
        }
        let columns: HashSet<&str> = r.column_names().collect();
        if columns.len() != r.columns.len() {
            return Err(err("duplicate column".into()));
        }
        for f in r.required_on_create.iter().chain(r.updatable) {
            if !columns.contains(f) {
                return Err(err(format!("unknown field '{}'", f)));
            }
            if *f == ID_COLUMN {
                return Err(err("id cannot be written by clients".into()));
            }
        }
        for c in r.columns {
            if let Some(target) = c.references {
                if !seen_tables.contains(target) || target == r.table {
                    return Err(err(format!(
                        "column '{}' references '{}' which is not declared before it",
                        c.name, target
                    )));
                }
            }
        }
    }
    Ok(())
}
