//! Mapping from workflow errors to JSON error responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chefmarket_storage::ParseStatusError;
use chefmarket_workflow::WorkflowError;
use tracing::error;

use super::json_error;

/// Handler error. Renders as `{"error": "<message>"}` with the status for
/// the underlying [`WorkflowError`], or the status axum chose for a body it
/// could not extract.
#[derive(Debug)]
pub(crate) enum ApiError {
    Workflow(WorkflowError),
    Body(JsonRejection),
}

impl ApiError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::Workflow(WorkflowError::Validation(message.into()))
    }

    pub(crate) fn status(&self) -> StatusCode {
        let err = match self {
            ApiError::Workflow(err) => err,
            ApiError::Body(rejection) => return rejection.status(),
        };
        match err {
            WorkflowError::Unauthorized => StatusCode::UNAUTHORIZED,
            WorkflowError::Forbidden(_) => StatusCode::FORBIDDEN,
            WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
            WorkflowError::InvalidTransition(_) | WorkflowError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            WorkflowError::Upstream(_) => StatusCode::BAD_GATEWAY,
            WorkflowError::Storage(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            WorkflowError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        Self::Workflow(err)
    }
}

impl From<ParseStatusError> for ApiError {
    fn from(err: ParseStatusError) -> Self {
        Self::Workflow(err.into())
    }
}

/// Malformed JSON, a missing content type or an oversized body.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Body(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Workflow(err) => {
                if status.is_server_error() {
                    error!(status = status.as_u16(), error = %err, "request failed");
                }
                err.to_string()
            }
            ApiError::Body(rejection) => rejection.body_text(),
        };
        json_error(status, &message).into_response()
    }
}
