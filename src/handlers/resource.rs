//! Resource CRUD handlers: list, read, create, update, delete.
//! Each takes the resource descriptor first; `routes::resource` binds it per mount.

use crate::config::Resource;
use crate::error::AppError;
use crate::response;
use crate::service::{CrudService, RequestValidator};
use crate::state::AppState;
use crate::store::Row;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;

fn parse_id(id_str: &str) -> Result<i64, AppError> {
    id_str
        .trim()
        .parse::<i64>()
        .map_err(|_| AppError::BadRequest("Invalid id".into()))
}

/// Request body as extracted: a parsed JSON value, or why there is none.
pub type JsonBody = Result<Json<Value>, JsonRejection>;

/// A missing or unparseable body counts as `{}` so presence checks answer with 400.
/// A body over the size limit is a 413.
fn body_to_map(body: JsonBody) -> Result<Row, AppError> {
    match body {
        Ok(Json(Value::Object(m))) => Ok(m),
        Ok(Json(_)) => Err(AppError::BadRequest("Request body must be a JSON object".into())),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            Err(AppError::PayloadTooLarge)
        }
        Err(rejection) => {
            tracing::debug!(reason = %rejection.body_text(), "unreadable body treated as empty");
            Ok(Row::new())
        }
    }
}

#[tracing::instrument(skip_all, fields(resource = resource.table))]
pub async fn list(
    resource: &'static Resource,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let rows = CrudService::list(state.store.as_ref(), resource).await?;
    Ok(response::many(rows))
}

#[tracing::instrument(skip_all, fields(resource = resource.table, id = %id_str))]
pub async fn read(
    resource: &'static Resource,
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let row = CrudService::read(state.store.as_ref(), resource, id).await?;
    Ok(response::ok(row))
}

#[tracing::instrument(skip_all, fields(resource = resource.table))]
pub async fn create(
    resource: &'static Resource,
    State(state): State<AppState>,
    body: JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let body = body_to_map(body)?;
    let values = RequestValidator::validate_create(resource, &body)?;
    let row = CrudService::create(state.store.as_ref(), resource, values).await?;
    Ok(response::created(row))
}

#[tracing::instrument(skip_all, fields(resource = resource.table, id = %id_str))]
pub async fn update(
    resource: &'static Resource,
    State(state): State<AppState>,
    Path(id_str): Path<String>,
    body: JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let body = body_to_map(body)?;
    let values = RequestValidator::validate_update(resource, &body)?;
    let row = CrudService::update(state.store.as_ref(), resource, id, values).await?;
    Ok(response::ok(row))
}

#[tracing::instrument(skip_all, fields(resource = resource.table, id = %id_str))]
pub async fn delete(
    resource: &'static Resource,
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    CrudService::delete(state.store.as_ref(), resource, id).await?;
    Ok(response::message(resource.deleted_message()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_must_be_integers() {
        assert_eq!(parse_id("42").expect("int"), 42);
        assert!(matches!(parse_id("abc"), Err(AppError::BadRequest(_))));
        assert!(parse_id("1.5").is_err());
    }

    #[test]
    fn bodies_must_be_objects() {
        assert!(matches!(body_to_map(Ok(Json(json!([1, 2])))), Err(AppError::BadRequest(_))));
        let m = body_to_map(Ok(Json(json!({"name": "Ada"})))).expect("object");
        assert_eq!(m["name"], "Ada");
    }
}
