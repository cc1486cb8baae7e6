//! Account handlers: profile sync, role lookup, listing and fraud marking.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chefmarket_storage::ProfileUpdate;
use chefmarket_workflow::{Capability, VerifiedIdentity};
use serde::Deserialize;

use super::error::ApiError;
use super::handlers::from_body;
use super::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileBody {
    email: String,
    name: Option<String>,
    photo_url: Option<String>,
    address: Option<String>,
}

/// PUT /users
///
/// Upserts the caller's own account. The body email must match the verified
/// identity; role and status are never taken from the body.
pub(crate) async fn handle_sync_profile(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<VerifiedIdentity>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let body: ProfileBody = from_body(body)?;
    state
        .gate
        .authorize(Some(&identity), Capability::SelfOnly(&body.email))
        .await?;

    let account = state
        .coordinator
        .sync_profile(ProfileUpdate {
            email: body.email,
            name: body.name,
            photo_url: body.photo_url,
            address: body.address,
        })
        .await?;
    Ok((StatusCode::OK, Json(account)))
}

/// GET /users
pub(crate) async fn handle_list_users(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<VerifiedIdentity>,
) -> Result<impl IntoResponse, ApiError> {
    state.gate.authorize(Some(&identity), Capability::Admin).await?;
    let accounts = state.coordinator.list_accounts().await?;
    Ok((StatusCode::OK, Json(accounts)))
}

/// GET /user/role/{email}
pub(crate) async fn handle_get_role(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<VerifiedIdentity>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .gate
        .authorize(Some(&identity), Capability::SelfOnly(&email))
        .await?;
    let role = state.coordinator.role_of(&email).await?;
    Ok((StatusCode::OK, Json(serde_json::json!({ "role": role }))))
}

/// PATCH /users/fraud/{email}
pub(crate) async fn handle_mark_fraud(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<VerifiedIdentity>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let admin = state.gate.authorize(Some(&identity), Capability::Admin).await?;
    let account = state.coordinator.mark_fraud(&email, &admin).await?;
    Ok((StatusCode::OK, Json(account)))
}
