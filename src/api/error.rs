use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::error;
use serde_json::json;

use crate::error::DomicileError;

/// An HTTP failure rendered as `{"status": <code>, "error": <message>}`.
#[derive(Debug)]
pub enum ApiError {
    NotFound(&'static str),
    BadRequest(&'static str),
    Internal(DomicileError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(DomicileError::ShuttingDown(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map a store error, turning `NotFound` into a 404 with `message`.
    pub fn lookup(err: DomicileError, message: &'static str) -> Self {
        if err.is_not_found() {
            ApiError::NotFound(message)
        } else {
            ApiError::Internal(err)
        }
    }
}

impl From<DomicileError> for ApiError {
    fn from(err: DomicileError) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::NotFound(message) | ApiError::BadRequest(message) => message.to_string(),
            ApiError::Internal(err) => {
                error!("[HTTP] Request failed: {}", err);
                "Internal error".to_string()
            }
        };

        let body = json!({ "status": status.as_u16(), "error": message });
        (status, Json(body)).into_response()
    }
}
