//! JSON error responses.

use crate::detect::DetectError;
use crate::faults::FaultError;
use crate::pipeline::PipelineError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Detect(#[from] DetectError),
    #[error(transparent)]
    Fault(#[from] FaultError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Detect(e) => ApiError::Detect(e),
            PipelineError::Fault(e) => ApiError::Fault(e),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Detect(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_input"),
            ApiError::Fault(FaultError::Validation(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation")
            }
            ApiError::Fault(FaultError::StoreUnavailable(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable")
            }
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let body = Json(json!({
            "error": {
                "kind": kind,
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}
