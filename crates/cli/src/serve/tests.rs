//! In-process HTTP tests driving the router with `oneshot`.

use std::str::FromStr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chefmarket_storage::{AccountStore, MemoryStorage, ProfileUpdate, Role};
use chefmarket_workflow::provider::{StaticIdentityVerifier, StaticPaymentProvider};
use chefmarket_workflow::Stores;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use time::OffsetDateTime;
use tower::ServiceExt;
use tower_http::cors::CorsLayer;

use super::router;
use super::state::AppState;

const ADMIN: &str = "admin-token";
const ALICE: &str = "alice-token";
const BOB: &str = "bob-token";

async fn test_app() -> Router {
    let storage = Arc::new(MemoryStorage::new());
    let now = OffsetDateTime::now_utc();
    storage
        .upsert_account(
            ProfileUpdate {
                email: "root@x.com".to_string(),
                ..ProfileUpdate::default()
            },
            now,
        )
        .await
        .unwrap();
    storage
        .set_role("root@x.com", Role::Admin, None, now)
        .await
        .unwrap();

    let verifier = StaticIdentityVerifier::new()
        .with_token(ADMIN, "root@x.com")
        .with_token(ALICE, "a@x.com")
        .with_token(BOB, "b@x.com");
    let state = AppState::new(
        Stores::from_backend(storage),
        Arc::new(verifier),
        Arc::new(StaticPaymentProvider::new()),
        "usd",
    );
    router(Arc::new(state), CorsLayer::permissive())
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    send_request(app, req).await
}

async fn send_request(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn sync_profile(app: &Router, token: &str, email: &str) {
    let (status, _) = send(
        app,
        Method::PUT,
        "/users",
        Some(token),
        Some(json!({ "email": email, "name": "Someone" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

fn decimal(value: &Value) -> Decimal {
    Decimal::from_str(value.to_string().trim_matches('"')).unwrap()
}

#[tokio::test]
async fn health_needs_no_credential() {
    let app = test_app().await;
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn missing_or_unknown_credentials_are_unauthorized() {
    let app = test_app().await;
    let (status, body) = send(&app, Method::GET, "/orders/mine", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, Method::GET, "/orders/mine", Some("forged"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_sync_is_self_only() {
    let app = test_app().await;
    let (status, _) = send(
        &app,
        Method::PUT,
        "/users",
        Some(ALICE),
        Some(json!({ "email": "b@x.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/users",
        Some(ALICE),
        Some(json!({ "email": "a@x.com", "photoUrl": "https://img/a.png", "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "user");
    assert_eq!(body["status"], "active");
    assert_eq!(body["photoUrl"], "https://img/a.png");
}

#[tokio::test]
async fn role_lookup_never_leaks_other_accounts() {
    let app = test_app().await;
    sync_profile(&app, ALICE, "a@x.com").await;

    let (status, body) = send(&app, Method::GET, "/user/role/a@x.com", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "user");

    let (status, _) = send(&app, Method::GET, "/user/role/a@x.com", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn chef_request_approval_flow() {
    let app = test_app().await;
    sync_profile(&app, ALICE, "a@x.com").await;

    let (status, request) = send(
        &app,
        Method::POST,
        "/requests",
        Some(ALICE),
        Some(json!({ "requestType": "chef" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(request["requestStatus"], "pending");
    assert_eq!(request["userEmail"], "a@x.com");
    let id = request["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/requests/{id}"),
        Some(ALICE),
        Some(json!({ "requestStatus": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, decided) = send(
        &app,
        Method::PATCH,
        &format!("/requests/{id}"),
        Some(ADMIN),
        Some(json!({ "requestStatus": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decided["requestStatus"], "approved");

    let (_, body) = send(&app, Method::GET, "/user/role/a@x.com", Some(ALICE), None).await;
    assert_eq!(body["role"], "chef");

    let (status, again) = send(
        &app,
        Method::PATCH,
        &format!("/requests/{id}"),
        Some(ADMIN),
        Some(json!({ "requestStatus": "rejected" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["requestStatus"], "approved");

    let (status, all) = send(&app, Method::GET, "/requests", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_enum_values_are_bad_requests() {
    let app = test_app().await;
    sync_profile(&app, ALICE, "a@x.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/requests",
        Some(ALICE),
        Some(json!({ "requestType": "superuser" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("superuser"));

    let (_, order) = send(
        &app,
        Method::POST,
        "/orders",
        Some(ALICE),
        Some(json!({ "chefId": "chef-1234", "mealId": "m1", "price": 10, "quantity": 1 })),
    )
    .await;
    let id = order["id"].as_str().unwrap();
    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/orders/{id}"),
        Some(ALICE),
        Some(json!({ "orderStatus": "shipped" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn paid_order_increases_total_payment() {
    let app = test_app().await;
    sync_profile(&app, BOB, "b@x.com").await;

    let (_, before) = send(&app, Method::GET, "/admin/stats", Some(ADMIN), None).await;
    assert_eq!(decimal(&before["totalPayment"]), Decimal::ZERO);

    let (status, order) = send(
        &app,
        Method::POST,
        "/orders",
        Some(BOB),
        Some(json!({
            "userEmail": "someone-else@x.com",
            "chefId": "chef-1234",
            "mealId": "m1",
            "price": 10,
            "quantity": 2
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["userEmail"], "b@x.com");
    assert_eq!(order["orderStatus"], "pending");
    assert_eq!(order["paymentStatus"], "Pending");
    let id = order["id"].as_str().unwrap();

    let (status, paid) = send(&app, Method::PATCH, &format!("/orders/{id}/pay"), Some(BOB), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["paymentStatus"], "paid");

    let (status, after) = send(&app, Method::GET, "/admin/stats", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&after["totalPayment"]), Decimal::new(20, 0));

    let (_, mine) = send(&app, Method::GET, "/orders/mine", Some(BOB), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn stats_are_admin_only() {
    let app = test_app().await;
    let (status, _) = send(&app, Method::GET, "/admin/stats", Some(BOB), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::GET, "/users", Some(BOB), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn chef_orders_require_ownership() {
    let app = test_app().await;
    let (status, _) = send(&app, Method::GET, "/orders/chef/chef-1234", Some(BOB), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(&app, Method::GET, "/orders/chef/chef-1234", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn fraud_marking_spares_admins_and_blocks_orders() {
    let app = test_app().await;
    sync_profile(&app, BOB, "b@x.com").await;

    let (status, _) = send(&app, Method::PATCH, "/users/fraud/root@x.com", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, users) = send(&app, Method::GET, "/users", Some(ADMIN), None).await;
    let root = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == "root@x.com")
        .unwrap();
    assert_eq!(root["status"], "active");

    let (status, body) = send(&app, Method::PATCH, "/users/fraud/b@x.com", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "fraud");

    let (status, _) = send(
        &app,
        Method::POST,
        "/orders",
        Some(BOB),
        Some(json!({ "chefId": "chef-1234", "mealId": "m1", "price": 10, "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::PATCH, "/users/fraud/nobody@x.com", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn payment_intent_returns_client_secret() {
    let app = test_app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/create-payment-intent",
        Some(BOB),
        Some(json!({ "amount": 20 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amountMinor"], 2000);
    assert!(body["clientSecret"].as_str().unwrap().starts_with("pi_static_"));

    let (status, _) = send(
        &app,
        Method::POST,
        "/create-payment-intent",
        Some(BOB),
        Some(json!({ "amount": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reconcile_is_admin_only() {
    let app = test_app().await;
    let (status, _) = send(&app, Method::POST, "/admin/reconcile", Some(BOB), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, report) = send(&app, Method::POST, "/admin/reconcile", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["examined"], 0);
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let app = test_app().await;
    let (status, body) = send(&app, Method::PATCH, "/orders/missing/pay", Some(BOB), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn malformed_bodies_get_json_errors() {
    let app = test_app().await;

    let truncated = Request::builder()
        .method(Method::POST)
        .uri("/orders")
        .header("authorization", format!("Bearer {BOB}"))
        .header("content-type", "application/json")
        .body(Body::from("{\"chefId\": "))
        .unwrap();
    let (status, body) = send_request(&app, truncated).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{body}");

    let untyped = Request::builder()
        .method(Method::PUT)
        .uri("/users")
        .header("authorization", format!("Bearer {ALICE}"))
        .body(Body::from(r#"{"email":"a@x.com"}"#))
        .unwrap();
    let (status, body) = send_request(&app, untyped).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body["error"].is_string(), "{body}");
}

#[tokio::test]
async fn amounts_beyond_decimal_range_are_bad_requests() {
    let max = Decimal::MAX.to_string();

    let app = test_app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/orders",
        Some(BOB),
        Some(json!({
            "chefId": "chef-1234",
            "mealId": "meal-1",
            "price": max,
            "quantity": 2,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &app,
        Method::POST,
        "/create-payment-intent",
        Some(BOB),
        Some(json!({ "amount": max })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, stats) = send(&app, Method::GET, "/admin/stats", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalOrders"], 0);
}
