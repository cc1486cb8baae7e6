//! Shared handlers and request-body helpers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::de::DeserializeOwned;

use super::error::ApiError;
use super::json_error;

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

/// Deserialize a JSON body into `T`, reporting failures as 400.
pub(crate) fn from_body<T: DeserializeOwned>(body: serde_json::Value) -> Result<T, ApiError> {
    serde_json::from_value(body)
        .map_err(|e| ApiError::bad_request(format!("invalid request body: {e}")))
}

/// Read a required string field from a JSON body.
pub(crate) fn required_str<'a>(
    body: &'a serde_json::Value,
    field: &str,
) -> Result<&'a str, ApiError> {
    body.get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiError::bad_request(format!("missing '{field}' field")))
}
