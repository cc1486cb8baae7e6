//! `chefmarket serve` -- HTTP JSON API for the chef marketplace.
//!
//! Every route except `/health` requires `Authorization: Bearer <token>`;
//! the token is verified by the configured identity provider and the
//! resulting identity is checked per route by the authorization gate.
//!
//! Endpoints:
//! - GET   /health                   - Server status (exempt from auth)
//! - PUT   /users                    - Upsert the caller's account
//! - GET   /users                    - List accounts (admin)
//! - GET   /user/role/{email}        - Caller's own role
//! - POST  /requests                 - Submit a chef/admin elevation request
//! - GET   /requests                 - List elevation requests (admin)
//! - PATCH /requests/{id}            - Approve or reject a request (admin)
//! - POST  /orders                   - Place an order
//! - GET   /orders/mine              - Caller's orders
//! - GET   /orders/chef/{chef_id}    - A chef's orders (owning chef or admin)
//! - PATCH /orders/{id}              - Set fulfillment status
//! - PATCH /orders/{id}/pay          - Mark an order paid
//! - POST  /create-payment-intent    - Payment intent client secret
//! - PATCH /users/fraud/{email}      - Mark an account as fraud (admin)
//! - GET   /admin/stats              - Aggregate statistics (admin)
//! - POST  /admin/reconcile          - Complete stuck approvals (admin)
//!
//! All responses use Content-Type: application/json. Errors are
//! `{"error": "<message>"}`.

mod admin;
mod error;
mod handlers;
mod middleware;
mod orders;
mod requests;
mod state;
mod users;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{middleware as axum_middleware, Json, Router};
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Settings;

use self::admin::{handle_admin_stats, handle_reconcile};
use self::handlers::{handle_health, handle_not_found};
use self::middleware::auth_middleware;
use self::orders::{
    handle_chef_orders, handle_create_payment_intent, handle_mark_paid, handle_my_orders,
    handle_place_order, handle_set_order_status,
};
use self::requests::{handle_list_requests, handle_submit_request, handle_transition_request};
use self::state::AppState;
use self::users::{handle_get_role, handle_list_users, handle_mark_fraud, handle_sync_profile};

/// Maximum request body size: 1 MB.
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

/// Build the CORS layer. No configured origins means any origin.
fn cors_layer(origins: &[String]) -> Result<CorsLayer, axum::http::header::InvalidHeaderValue> {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let values = origins
            .iter()
            .map(|o| HeaderValue::from_str(o))
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(values)
    };
    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH])
        .allow_headers(Any))
}

pub(crate) fn router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/users", get(handle_list_users).put(handle_sync_profile))
        .route("/user/role/{email}", get(handle_get_role))
        .route("/users/fraud/{email}", patch(handle_mark_fraud))
        .route(
            "/requests",
            get(handle_list_requests).post(handle_submit_request),
        )
        .route("/requests/{id}", patch(handle_transition_request))
        .route("/orders", post(handle_place_order))
        .route("/orders/mine", get(handle_my_orders))
        .route("/orders/chef/{chef_id}", get(handle_chef_orders))
        .route("/orders/{id}", patch(handle_set_order_status))
        .route("/orders/{id}/pay", patch(handle_mark_paid))
        .route("/create-payment-intent", post(handle_create_payment_intent))
        .route("/admin/stats", get(handle_admin_stats))
        .route("/admin/reconcile", post(handle_reconcile))
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server and the background reconciler.
pub async fn start_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::from_settings(&settings));
    info!(
        identity = state.verifier.provider_id(),
        currency = %settings.payment.currency,
        "stores initialized (in-memory)"
    );

    let cors = cors_layer(&settings.cors_origins)?;
    let reconciler = spawn_reconciler(state.clone(), settings.reconcile_interval_secs);
    let app = router(state, cors);

    let addr = format!("0.0.0.0:{}", settings.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("chefmarket listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = reconciler {
        handle.abort();
    }
    info!("server shut down");
    Ok(())
}

/// Run [`reconcile`](chefmarket_workflow::WorkflowCoordinator::reconcile)
/// every `interval_secs`. `0` disables the task.
fn spawn_reconciler(state: Arc<AppState>, interval_secs: u64) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        info!("background reconciliation disabled");
        return None;
    }
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match state.coordinator.reconcile().await {
                Ok(report) if report.examined > 0 => info!(
                    examined = report.examined,
                    applied = report.applied,
                    failed = report.failed,
                    "reconciliation pass"
                ),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "reconciliation pass failed"),
            }
        }
    }))
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("received shutdown signal");
}
