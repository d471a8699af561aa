//! Generic CRUD execution against a `Store`, with per-resource error messages.

use crate::config::{Action, Resource, CREATED_AT, UPDATED_AT};
use crate::error::{AppError, StoreError};
use crate::sql::now_timestamp;
use crate::store::{Row, Store};

pub struct CrudService;

fn internal(resource: &Resource, action: Action) -> impl FnOnce(StoreError) -> AppError + '_ {
    move |source| AppError::Internal {
        message: resource.failure_message(action),
        source,
    }
}

impl CrudService {
    /// Every row, unfiltered and unpaginated.
    pub async fn list(store: &dyn Store, resource: &'static Resource) -> Result<Vec<Row>, AppError> {
        store
            .list(resource)
            .await
            .map_err(internal(resource, Action::List))
    }

    pub async fn read(store: &dyn Store, resource: &'static Resource, id: i64) -> Result<Row, AppError> {
        store
            .find(resource, id)
            .await
            .map_err(internal(resource, Action::Fetch))?
            .ok_or_else(|| AppError::NotFound(resource.not_found_message()))
    }

    /// `values` has already passed create validation.
    pub async fn create(store: &dyn Store, resource: &'static Resource, mut values: Row) -> Result<Row, AppError> {
        if resource.stamp_created_at_on_create {
            values.insert(CREATED_AT.to_string(), now_timestamp());
        }
        let row = store
            .insert(resource, &values)
            .await
            .map_err(internal(resource, Action::Create))?;
        tracing::info!(resource = resource.table, id = ?row.get("id"), "created");
        Ok(row)
    }

    /// `values` holds only the fields to change; `updated_at` is stamped here.
    pub async fn update(
        store: &dyn Store,
        resource: &'static Resource,
        id: i64,
        mut values: Row,
    ) -> Result<Row, AppError> {
        values.insert(UPDATED_AT.to_string(), now_timestamp());
        store
            .update(resource, id, &values)
            .await
            .map_err(internal(resource, Action::Update))?
            .ok_or_else(|| AppError::NotFound(resource.not_found_message()))
    }

    pub async fn delete(store: &dyn Store, resource: &'static Resource, id: i64) -> Result<(), AppError> {
        let count = store
            .delete(resource, id)
            .await
            .map_err(internal(resource, Action::Delete))?;
        if count == 0 {
            return Err(AppError::NotFound(resource.not_found_message()));
        }
        tracing::info!(resource = resource.table, id, "deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{POSTS, RESOURCES, USERS};
    use crate::store::MemoryStore;
    use serde_json::json;

    fn row(v: serde_json::Value) -> Row {
        v.as_object().cloned().expect("object")
    }

    #[tokio::test]
    async fn post_create_stamps_created_at() {
        let store = MemoryStore::new(&RESOURCES);
        let user = CrudService::create(&store, &USERS, row(json!({"name": "Ada", "email": "a@b.c"})))
            .await
            .expect("user");
        let post = CrudService::create(
            &store,
            &POSTS,
            row(json!({"title": "t", "content": "c", "created_by": user["id"].clone()})),
        )
        .await
        .expect("post");
        assert!(post["created_at"].is_string());
        assert_eq!(post["created_by"], user["id"]);
    }

    #[tokio::test]
    async fn store_failures_become_generic_500_messages() {
        let store = MemoryStore::new(&RESOURCES);
        let err = CrudService::create(&store, &POSTS, row(json!({"title": "t", "content": "c", "created_by": 5})))
            .await
            .expect_err("fk violation");
        match err {
            AppError::Internal { message, source } => {
                assert_eq!(message, "Failed to create post");
                assert!(matches!(source, StoreError::ForeignKeyViolation { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_stamps_updated_at() {
        let store = MemoryStore::new(&RESOURCES);
        let long_ago = "2020-01-01T00:00:00.000Z";
        store
            .insert(&USERS, &row(json!({"name": "Ada", "email": "a@b.c", "updated_at": long_ago})))
            .await
            .expect("seed");
        let updated = CrudService::update(&store, &USERS, 1, row(json!({"email": "ada@b.c"})))
            .await
            .expect("update");
        assert_eq!(updated["name"], "Ada");
        assert_ne!(updated["updated_at"], long_ago);
        let stamped = crate::sql::parse_timestamp(updated["updated_at"].as_str().expect("string")).expect("rfc3339");
        assert!(stamped > crate::sql::parse_timestamp(long_ago).expect("rfc3339"));
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let store = MemoryStore::new(&RESOURCES);
        assert!(matches!(
            CrudService::read(&store, &USERS, 1).await,
            Err(AppError::NotFound(ref m)) if m == "User not found"
        ));
        assert!(matches!(
            CrudService::update(&store, &POSTS, 1, row(json!({"title": "x"}))).await,
            Err(AppError::NotFound(ref m)) if m == "Post not found"
        ));
        assert!(matches!(
            CrudService::delete(&store, &USERS, 1).await,
            Err(AppError::NotFound(_))
        ));
    }
}
