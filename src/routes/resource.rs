//! Resource CRUD routes. One router per resource descriptor; mount it under the
//! resource's path (`/users`, `/posts`).

use crate::config::Resource;
use crate::handlers::resource::{create, delete, list, read, update, JsonBody};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};

pub fn resource_routes(resource: &'static Resource) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(move |state: State<AppState>| list(resource, state)).post(
                move |state: State<AppState>, body: JsonBody| create(resource, state, body),
            ),
        )
        .route(
            "/:id",
            get(move |state: State<AppState>, id: Path<String>| read(resource, state, id))
                .put(
                    move |state: State<AppState>, id: Path<String>, body: JsonBody| {
                        update(resource, state, id, body)
                    },
                )
                .delete(move |state: State<AppState>, id: Path<String>| delete(resource, state, id)),
        )
}
