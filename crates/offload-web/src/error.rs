//! Handler-level errors and their HTTP mapping.

use std::convert::Infallible;

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::http::header::ALLOW;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use offload_core::{BatchError, BridgeError};
use offload_store::StoreError;
use serde_json::json;
use thiserror::Error;

use crate::render::RenderError;

/// Everything a handler can fail with.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("method {method} not allowed")]
    MethodNotAllowed { method: Method, allow: String },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Timeout(String),

    /// A simulated remote call failed.
    #[error("upstream call failed: {0}")]
    Upstream(String),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Store(_) | Self::Render(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::NotFound(err.to_string()),
            other => Self::Store(other),
        }
    }
}

impl From<Infallible> for AppError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

impl<E: Into<AppError>> From<BridgeError<E>> for AppError {
    fn from(err: BridgeError<E>) -> Self {
        match err {
            BridgeError::Operation(e) => e.into(),
            BridgeError::Timeout { ms } => {
                Self::Timeout(format!("blocking operation timed out after {ms}ms"))
            }
            BridgeError::Panicked { message } => {
                Self::Internal(format!("blocking operation panicked: {message}"))
            }
            BridgeError::Unavailable(reason) => {
                Self::Internal(format!("worker pool unavailable: {reason}"))
            }
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        if rejection.status().is_client_error() {
            Self::BadRequest(rejection.body_text())
        } else {
            Self::Internal(rejection.body_text())
        }
    }
}

impl From<BatchError> for AppError {
    fn from(err: BatchError) -> Self {
        if err.is_timeout() {
            return Self::Timeout(err.to_string());
        }
        match err {
            BatchError::InvalidChunkSize(_) => Self::BadRequest(err.to_string()),
            BatchError::UnitFailed { .. } => Self::Upstream(err.to_string()),
            BatchError::Cancelled { .. } | BatchError::Join(_) => Self::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
        }

        let allow = match &self {
            Self::MethodNotAllowed { allow, .. } => HeaderValue::from_str(allow).ok(),
            _ => None,
        };
        let mut response = (status, Json(json!({ "error": self.to_string() }))).into_response();
        if let Some(allow) = allow {
            response.headers_mut().insert(ALLOW, allow);
        }
        response
    }
}
