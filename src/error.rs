use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

#[derive(Error, Debug)]
pub enum Error {
    #[error("not found")]
    NotFound,

    #[error("invalid credentials")]
    Unauthorized,

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("malformed request body: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] mysql::Error),

    #[error("store error: {0}")]
    Store(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// A validation failure on a single form field.
    pub fn invalid(field: &'static str, code: &'static str) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, ValidationError::new(code));
        Error::Validation(errors)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                json!({ "status": "fail", "message": "not found" }),
            ),
            Error::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "status": "fail", "message": "invalid credentials" }),
            ),
            Error::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "status": "fail", "message": "validation failed", "errors": errors }),
            ),
            Error::Malformed(err) => (
                StatusCode::BAD_REQUEST,
                json!({ "status": "fail", "message": format!("malformed request body: {}", err) }),
            ),
            _ => {
                tracing::error!("request failed: {:?}", &self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "status": "fail", "message": "internal server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
