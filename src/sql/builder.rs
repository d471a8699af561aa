//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from a resource descriptor.

use crate::config::{Column, Resource, ID_COLUMN};
use crate::sql::BindValue;

/// Quote identifier for PostgreSQL (safe: only from static descriptors).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<BindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: BindValue) -> String {
        self.params.push(v);
        format!("${}", self.params.len())
    }
}

fn select_column_list(resource: &Resource) -> String {
    resource
        .column_names()
        .map(quoted)
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT every row, ordered by id.
pub fn select_all(resource: &Resource) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        select_column_list(resource),
        quoted(resource.table),
        quoted(ID_COLUMN)
    );
    q
}

/// SELECT by primary key.
pub fn select_by_id(resource: &Resource, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(BindValue::Int(Some(id)));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(resource),
        quoted(resource.table),
        quoted(ID_COLUMN),
        ph
    );
    q
}

/// SELECT one column of every row, ordered by id.
pub fn pluck(resource: &Resource, column: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        quoted(column),
        quoted(resource.table),
        quoted(ID_COLUMN)
    );
    q
}

/// INSERT one row. Columns absent from `values` keep their defaults.
pub fn insert(resource: &Resource, values: Vec<(&Column, BindValue)>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let returning = select_column_list(resource);
    if values.is_empty() {
        q.sql = format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            quoted(resource.table),
            returning
        );
        return q;
    }
    let mut cols = Vec::with_capacity(values.len());
    let mut placeholders = Vec::with_capacity(values.len());
    for (c, v) in values {
        cols.push(quoted(c.name));
        placeholders.push(q.push_param(v));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        quoted(resource.table),
        cols.join(", "),
        placeholders.join(", "),
        returning
    );
    q
}

/// Multi-row INSERT. The column list is the union of the rows' columns; a row
/// missing one of them gets `DEFAULT` in that slot.
pub fn insert_many(resource: &Resource, rows: Vec<Vec<(&Column, BindValue)>>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let used: Vec<&Column> = resource
        .columns
        .iter()
        .filter(|c| rows.iter().any(|r| r.iter().any(|(rc, _)| rc.name == c.name)))
        .collect();
    let mut tuples = Vec::with_capacity(rows.len());
    for mut row in rows {
        let mut slots = Vec::with_capacity(used.len());
        for c in &used {
            match row.iter().position(|(rc, _)| rc.name == c.name) {
                Some(i) => {
                    let (_, v) = row.swap_remove(i);
                    slots.push(q.push_param(v));
                }
                None => slots.push("DEFAULT".to_string()),
            }
        }
        tuples.push(format!("({})", slots.join(", ")));
    }
    let cols: Vec<String> = used.iter().map(|c| quoted(c.name)).collect();
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES {}",
        quoted(resource.table),
        cols.join(", "),
        tuples.join(", ")
    );
    q
}

/// PostgreSQL caps one statement at this many bind parameters.
pub const MAX_BIND_PARAMS: usize = 65_535;

/// `insert_many` split so no statement binds more than `MAX_BIND_PARAMS` values.
/// Run the batches in one transaction to keep the bulk insert all-or-nothing.
pub fn insert_many_batches(resource: &Resource, rows: Vec<Vec<(&Column, BindValue)>>) -> Vec<QueryBuf> {
    let per_statement = (MAX_BIND_PARAMS / resource.columns.len().max(1)).max(1);
    let mut batches = Vec::new();
    let mut rows = rows.into_iter().peekable();
    while rows.peek().is_some() {
        let chunk: Vec<_> = rows.by_ref().take(per_statement).collect();
        batches.push(insert_many(resource, chunk));
    }
    batches
}

/// UPDATE by id: SET only the given columns; never the primary key.
/// With nothing to set this degrades to a SELECT by id so the caller still gets the row.
pub fn update(resource: &Resource, id: i64, values: Vec<(&Column, BindValue)>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for (c, v) in values {
        if c.name == ID_COLUMN {
            continue;
        }
        let ph = q.push_param(v);
        sets.push(format!("{} = {}", quoted(c.name), ph));
    }
    if sets.is_empty() {
        return select_by_id(resource, id);
    }
    let id_ph = q.push_param(BindValue::Int(Some(id)));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        quoted(resource.table),
        sets.join(", "),
        quoted(ID_COLUMN),
        id_ph,
        select_column_list(resource)
    );
    q
}

/// DELETE by id.
pub fn delete(resource: &Resource, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(BindValue::Int(Some(id)));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {}",
        quoted(resource.table),
        quoted(ID_COLUMN),
        ph
    );
    q
}

/// DELETE every row.
pub fn delete_all(resource: &Resource) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("DELETE FROM {}", quoted(resource.table));
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{POSTS, USERS};

    fn col(resource: &'static Resource, name: &str) -> &'static Column {
        resource.column(name).expect("column")
    }

    #[test]
    fn select_all_lists_columns_in_order() {
        let q = select_all(&USERS);
        assert_eq!(
            q.sql,
            r#"SELECT "id", "name", "email", "created_at", "updated_at" FROM "users" ORDER BY "id""#
        );
        assert!(q.params.is_empty());
    }

    #[test]
    fn insert_binds_values_and_returns_row() {
        let q = insert(
            &USERS,
            vec![
                (col(&USERS, "name"), BindValue::Text(Some("Ada".into()))),
                (col(&USERS, "email"), BindValue::Text(Some("ada@example.com".into()))),
            ],
        );
        assert_eq!(
            q.sql,
            r#"INSERT INTO "users" ("name", "email") VALUES ($1, $2) RETURNING "id", "name", "email", "created_at", "updated_at""#
        );
        assert_eq!(q.params.len(), 2);
    }

    #[test]
    fn update_skips_id_and_binds_id_last() {
        let q = update(
            &POSTS,
            9,
            vec![
                (col(&POSTS, "id"), BindValue::Int(Some(1))),
                (col(&POSTS, "title"), BindValue::Text(Some("New".into()))),
            ],
        );
        assert!(q.sql.starts_with(r#"UPDATE "posts" SET "title" = $1 WHERE "id" = $2 RETURNING"#), "{}", q.sql);
        assert_eq!(q.params.last(), Some(&BindValue::Int(Some(9))));
    }

    #[test]
    fn empty_update_selects_row() {
        let q = update(&POSTS, 3, Vec::new());
        assert!(q.sql.starts_with("SELECT "), "{}", q.sql);
        assert_eq!(q.params, vec![BindValue::Int(Some(3))]);
    }

    #[test]
    fn insert_many_fills_missing_slots_with_default() {
        let title = col(&POSTS, "title");
        let created_by = col(&POSTS, "created_by");
        let q = insert_many(
            &POSTS,
            vec![
                vec![(title, BindValue::Text(Some("a".into()))), (created_by, BindValue::Int(Some(1)))],
                vec![(title, BindValue::Text(Some("b".into())))],
            ],
        );
        assert_eq!(
            q.sql,
            r#"INSERT INTO "posts" ("created_by", "title") VALUES ($1, $2), (DEFAULT, $3)"#
        );
        assert_eq!(q.params.len(), 3);
    }

    #[test]
    fn bulk_insert_batches_stay_under_bind_limit() {
        let row = || {
            vec![
                (col(&USERS, "name"), BindValue::Text(Some("Ada".into()))),
                (col(&USERS, "email"), BindValue::Text(Some("a@b.c".into()))),
                (col(&USERS, "created_at"), BindValue::Timestamp(None)),
                (col(&USERS, "updated_at"), BindValue::Timestamp(None)),
            ]
        };
        let rows: Vec<_> = (0..16_384).map(|_| row()).collect();
        let batches = insert_many_batches(&USERS, rows);

        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|q| q.params.len() <= MAX_BIND_PARAMS));
        assert_eq!(batches.iter().map(|q| q.params.len()).sum::<usize>(), 16_384 * 4);
        assert!(batches.iter().all(|q| q.sql.starts_with(r#"INSERT INTO "users""#)));
    }

    #[test]
    fn small_bulk_insert_is_one_statement() {
        let rows = vec![vec![(col(&USERS, "name"), BindValue::Text(Some("Ada".into())))]];
        assert_eq!(insert_many_batches(&USERS, rows).len(), 1);
        assert!(insert_many_batches(&USERS, Vec::new()).is_empty());
    }

    #[test]
    fn delete_by_id() {
        let q = delete(&USERS, 4);
        assert_eq!(q.sql, r#"DELETE FROM "users" WHERE "id" = $1"#);
        assert_eq!(delete_all(&POSTS).sql, r#"DELETE FROM "posts""#);
    }
}
