//! Elevation request handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chefmarket_storage::{RequestStatus, RequestType};
use chefmarket_workflow::{Capability, VerifiedIdentity};

use super::error::ApiError;
use super::handlers::required_str;
use super::state::AppState;

/// POST /requests
///
/// Body: `{"requestType": "chef" | "admin"}`. The requester is always the
/// caller.
pub(crate) async fn handle_submit_request(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<VerifiedIdentity>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let caller = state.gate.authorize(Some(&identity), Capability::Active).await?;
    let request_type: RequestType = required_str(&body, "requestType")?.parse()?;
    let request = state
        .coordinator
        .submit_request(&caller, request_type)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// GET /requests
pub(crate) async fn handle_list_requests(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<VerifiedIdentity>,
) -> Result<impl IntoResponse, ApiError> {
    state.gate.authorize(Some(&identity), Capability::Admin).await?;
    let requests = state.coordinator.list_requests().await?;
    Ok((StatusCode::OK, Json(requests)))
}

/// PATCH /requests/{id}
///
/// Body: `{"requestStatus": "approved" | "rejected"}`. Already-decided
/// requests are returned unchanged with 200.
pub(crate) async fn handle_transition_request(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<VerifiedIdentity>,
    Path(id): Path<String>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let admin = state.gate.authorize(Some(&identity), Capability::Admin).await?;
    let target: RequestStatus = required_str(&body, "requestStatus")?.parse()?;
    let request = state
        .coordinator
        .transition_request(&id, target, &admin)
        .await?;
    Ok((StatusCode::OK, Json(request)))
}
