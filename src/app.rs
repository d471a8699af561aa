//! Full application router: demo pages, health, and the users/posts resources,
//! wrapped in permissive CORS, HTTP tracing and a request body limit.

use crate::config::{POSTS, USERS};
use crate::routes::{common_routes, demo_routes, resource_routes};
use crate::state::AppState;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Sits outside CORS: `Cors` needs a `Default` inner response body.
pub const BODY_LIMIT_BYTES: usize = 1024 * 1024;

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(demo_routes())
        .merge(common_routes())
        .nest("/users", resource_routes(&USERS))
        .nest("/posts", resource_routes(&POSTS))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
