//! Admin handlers: aggregate stats and manual reconciliation.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chefmarket_workflow::{Capability, VerifiedIdentity};
use tracing::info;

use super::error::ApiError;
use super::state::AppState;

/// GET /admin/stats
pub(crate) async fn handle_admin_stats(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<VerifiedIdentity>,
) -> Result<impl IntoResponse, ApiError> {
    state.gate.authorize(Some(&identity), Capability::Admin).await?;
    let stats = state.coordinator.admin_stats().await?;
    Ok((StatusCode::OK, Json(stats)))
}

/// POST /admin/reconcile
pub(crate) async fn handle_reconcile(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<VerifiedIdentity>,
) -> Result<impl IntoResponse, ApiError> {
    let admin = state.gate.authorize(Some(&identity), Capability::Admin).await?;
    let report = state.coordinator.reconcile().await?;
    info!(admin = %admin.email, examined = report.examined, applied = report.applied, "manual reconciliation");
    Ok((StatusCode::OK, Json(report)))
}
