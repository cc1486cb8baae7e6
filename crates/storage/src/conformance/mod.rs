//! Conformance test suite for chefmarket store implementations.
//!
//! This module provides a backend-agnostic test suite that any [`Storage`]
//! implementation can run to verify correctness. The suite covers:
//!
//! - **Accounts**: insert-only defaults on upsert, role/status overwrites,
//!   not-found errors
//! - **Requests**: append, pending-only compare-and-set, applied marker,
//!   reconciliation listing
//! - **Orders**: insert, filters, unconditional status overwrite, one-way
//!   payment status
//! - **Concurrency**: racing decisions on one request, parallel writers on
//!   distinct records
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function that
//! creates a fresh, empty storage instance for each test:
//!
//! ```ignore
//! use chefmarket_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn mongo_conformance() {
//!     let report = run_conformance_suite(|| async {
//!         create_test_mongo_storage().await
//!     }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod account;
mod concurrent;
mod order;
mod request;

use std::fmt;
use std::future::Future;

use rust_decimal::Decimal;
use time::macros::datetime;
use time::OffsetDateTime;

use crate::record::{ElevationRequest, Order, ProfileUpdate};
use crate::status::{OrderStatus, PaymentStatus, RequestStatus, RequestType};
use crate::Storage;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "account", "request", "order").
    pub category: String,
    /// Test name (e.g. "upsert_defaults_role_and_status_on_insert").
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn pass(category: &str, name: &str) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: true,
            message: None,
        }
    }

    fn fail(category: &str, name: &str, msg: String) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: false,
            message: Some(msg),
        }
    }

    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::pass(category, name),
            Err(msg) => Self::fail(category, name, msg),
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a storage backend.
///
/// The `factory` function is called once per test to create a fresh, empty
/// storage instance, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(account::run_account_tests(&factory).await);
    results.extend(request::run_request_tests(&factory).await);
    results.extend(order::run_order_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers: record constructors with sensible defaults ──────────────────────

const T0: OffsetDateTime = datetime!(2025-01-01 0:00 UTC);
const T1: OffsetDateTime = datetime!(2025-01-01 0:05 UTC);
const T2: OffsetDateTime = datetime!(2025-01-01 0:10 UTC);

fn make_profile(email: &str) -> ProfileUpdate {
    ProfileUpdate {
        email: email.to_string(),
        name: Some("Test User".to_string()),
        photo_url: None,
        address: None,
    }
}

fn make_request(id: &str, user_email: &str, request_type: RequestType) -> ElevationRequest {
    ElevationRequest {
        id: id.to_string(),
        user_email: user_email.to_string(),
        request_type,
        request_status: RequestStatus::Pending,
        request_time: T0,
        decided_at: None,
        applied: false,
    }
}

fn make_order(id: &str, user_email: &str, chef_id: &str) -> Order {
    Order {
        id: id.to_string(),
        user_email: user_email.to_string(),
        chef_id: chef_id.to_string(),
        meal_id: "meal-1".to_string(),
        meal_name: Some("Test Meal".to_string()),
        delivery_address: None,
        price: Decimal::new(10, 0),
        quantity: 2,
        order_status: OrderStatus::Pending,
        payment_status: PaymentStatus::Pending,
        order_time: T0,
        paid_at: None,
    }
}
