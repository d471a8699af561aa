//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown environment '{0}' (expected development, test or production)")]
    UnknownEnvironment(String),
    #[error("invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
    #[error("{0} must be set for the {1} environment")]
    Missing(&'static str, &'static str),
    #[error("resource {resource}: {message}")]
    Resource { resource: &'static str, message: String },
}

/// Failures of the data access layer. Every variant is a 500 at the HTTP edge.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("unique violation on {table}: {detail}")]
    UniqueViolation { table: String, detail: String },
    #[error("foreign key violation on {table}: {detail}")]
    ForeignKeyViolation { table: String, detail: String },
    #[error("invalid value for column {column}: {reason}")]
    InvalidValue { column: String, reason: String },
    #[error("unknown table {0}")]
    UnknownTable(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("request body too large")]
    PayloadTooLarge,
    /// `message` is what the client sees; `source` is only logged.
    #[error("{message}: {source}")]
    Internal {
        message: String,
        #[source]
        source: StoreError,
    },
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            AppError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large".to_string()),
            AppError::Internal { message, source } => {
                tracing::error!(error = %source, "{}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
