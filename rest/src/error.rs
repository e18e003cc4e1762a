use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    /// Market-data or model provider failed.
    Upstream(String),
    Unavailable(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BadRequest", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NotFound", msg),
            AppError::Upstream(msg) => {
                tracing::warn!("Upstream error: {msg}");
                (StatusCode::BAD_GATEWAY, "UpstreamError", msg)
            }
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "Unavailable", msg),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalError",
                    "An internal error occurred".to_owned(),
                )
            }
        };

        return (status, Json(ErrorResponse { error, message })).into_response();
    }
}

impl From<journal::Error> for AppError {
    fn from(err: journal::Error) -> Self {
        return match err {
            journal::Error::NotFound(_) => AppError::NotFound(err.to_string()),
            journal::Error::ProviderError(_) => AppError::Upstream(format!("{err:#}")),
            journal::Error::ModelError(err) => err.into(),
            journal::Error::CsvError(_) => AppError::BadRequest(format!("{err:#}")),
            err => AppError::Internal(format!("{err:#}")),
        };
    }
}

impl From<models::Error> for AppError {
    fn from(err: models::Error) -> Self {
        return AppError::BadRequest(format!("{err:#}"));
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        return AppError::Internal(format!("{err:#}"));
    }
}
