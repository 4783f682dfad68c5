//! Mapping of core failures onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use marine_core::Error;
use serde_json::json;

use crate::reload::ReloadError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] Error),

    #[error(transparent)]
    Reload(#[from] ReloadError),

    #[error("worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(err) => match err {
                Error::MissingField(_)
                | Error::InvalidInput(_)
                | Error::Geometry(_)
                | Error::UnsupportedScoreType(_) => StatusCode::BAD_REQUEST,
                Error::SizeLimit { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                Error::UnreachableDestination { .. } => StatusCode::CONFLICT,
                Error::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            ApiError::Reload(ReloadError::Busy) => StatusCode::CONFLICT,
            ApiError::Reload(ReloadError::NotConfigured | ReloadError::Storage(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Reload(ReloadError::Task(_)) | ApiError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
