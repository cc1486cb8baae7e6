//! Order handlers: checkout, fulfillment status, payment.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chefmarket_storage::OrderStatus;
use chefmarket_workflow::{Capability, NewOrder, VerifiedIdentity};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::error::ApiError;
use super::handlers::{from_body, required_str};
use super::state::AppState;

/// POST /orders
///
/// Body: `{"chefId", "mealId", "mealName"?, "deliveryAddress"?, "price",
/// "quantity"}`. The buyer is the caller, whatever the body says.
pub(crate) async fn handle_place_order(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<VerifiedIdentity>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let caller = state.gate.authorize(Some(&identity), Capability::Active).await?;
    let new_order: NewOrder = from_body(body)?;
    let order = state.coordinator.place_order(&caller, new_order).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders/mine
pub(crate) async fn handle_my_orders(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<VerifiedIdentity>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = state.gate.authorize(Some(&identity), Capability::Any).await?;
    let orders = state.coordinator.orders_for_buyer(&caller.email).await?;
    Ok((StatusCode::OK, Json(orders)))
}

/// GET /orders/chef/{chef_id}
pub(crate) async fn handle_chef_orders(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<VerifiedIdentity>,
    Path(chef_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .gate
        .authorize(Some(&identity), Capability::ChefOwner(&chef_id))
        .await?;
    let orders = state.coordinator.orders_for_chef(&chef_id).await?;
    Ok((StatusCode::OK, Json(orders)))
}

/// PATCH /orders/{id}
///
/// Body: `{"orderStatus": "..."}`. Any verified caller may set any status.
pub(crate) async fn handle_set_order_status(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<VerifiedIdentity>,
    Path(id): Path<String>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    state.gate.authorize(Some(&identity), Capability::Any).await?;
    let status: OrderStatus = required_str(&body, "orderStatus")?.parse()?;
    let order = state.coordinator.set_fulfillment_status(&id, status).await?;
    Ok((StatusCode::OK, Json(order)))
}

/// PATCH /orders/{id}/pay
pub(crate) async fn handle_mark_paid(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<VerifiedIdentity>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.gate.authorize(Some(&identity), Capability::Any).await?;
    let order = state.coordinator.mark_paid(&id).await?;
    Ok((StatusCode::OK, Json(order)))
}

#[derive(Debug, Deserialize)]
struct PaymentIntentBody {
    amount: Decimal,
}

/// POST /create-payment-intent
///
/// Body: `{"amount": <major units>}`. Returns the provider's client secret.
pub(crate) async fn handle_create_payment_intent(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<VerifiedIdentity>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    state.gate.authorize(Some(&identity), Capability::Any).await?;
    let body: PaymentIntentBody = from_body(body)?;
    let intent = state.coordinator.create_payment_intent(body.amount).await?;
    Ok((StatusCode::OK, Json(intent)))
}
