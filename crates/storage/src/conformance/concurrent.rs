use std::future::Future;
use std::sync::Arc;

use super::{make_order, make_profile, make_request, TestResult, T0, T1};
use crate::record::OrderFilter;
use crate::status::{AccountStatus, OrderStatus, RequestStatus, RequestType, Role};
use crate::{Storage, StorageError};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "concurrent",
            "concurrent_decisions_exactly_one_wins",
            concurrent_decisions_exactly_one_wins(factory).await,
        ),
        TestResult::from_result(
            "concurrent",
            "concurrent_upserts_create_one_account",
            concurrent_upserts_create_one_account(factory).await,
        ),
        TestResult::from_result(
            "concurrent",
            "concurrent_writes_to_distinct_orders_all_succeed",
            concurrent_writes_to_distinct_orders_all_succeed(factory).await,
        ),
        TestResult::from_result(
            "concurrent",
            "racing_admin_grant_and_fraud_mark_never_combine",
            racing_admin_grant_and_fraud_mark_never_combine(factory).await,
        ),
    ]
}

// ── Concurrent decisions: exactly one wins ──────────────────────────────────

/// N tasks race to approve or reject the same pending request. Exactly one
/// observes the transition; every other task sees the winner's record.
async fn concurrent_decisions_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    storage
        .insert_request(make_request("req-1", "a@x.com", RequestType::Chef))
        .await
        .map_err(|e| format!("insert: {e}"))?;

    let mut handles = Vec::new();
    for i in 0..N {
        let s = storage.clone();
        let target = if i % 2 == 0 {
            RequestStatus::Approved
        } else {
            RequestStatus::Rejected
        };
        handles.push(tokio::spawn(async move {
            s.decide_request("req-1", target, T1).await
        }));
    }

    let mut winners = 0usize;
    let mut outcomes = Vec::new();
    for handle in handles {
        let outcome = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
        if outcome.transitioned {
            winners += 1;
        }
        outcomes.push(outcome.request.request_status);
    }

    if winners != 1 {
        return Err(format!("expected exactly 1 winner, got {winners}"));
    }
    let stored = storage
        .get_request("req-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if outcomes.iter().any(|s| *s != stored.request_status) {
        return Err(format!(
            "tasks observed diverging statuses {:?}, stored {}",
            outcomes, stored.request_status
        ));
    }
    Ok(())
}

// ── Concurrent upserts of one email ─────────────────────────────────────────

async fn concurrent_upserts_create_one_account<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);

    let mut handles = Vec::new();
    for _ in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(async move {
            s.upsert_account(make_profile("a@x.com"), T0).await
        }));
    }
    for handle in handles {
        let acct = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
        if acct.role != Role::User {
            return Err(format!("unexpected role {}", acct.role));
        }
    }

    let all = storage
        .list_accounts()
        .await
        .map_err(|e| format!("list: {e}"))?;
    if all.len() != 1 {
        return Err(format!("expected 1 account, got {}", all.len()));
    }
    Ok(())
}

// ── Concurrent writes to different orders: all succeed ──────────────────────

async fn concurrent_writes_to_distinct_orders_all_succeed<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    for i in 0..N {
        storage
            .insert_order(make_order(&format!("order-{i}"), "b@x.com", "chef-1234"))
            .await
            .map_err(|e| format!("insert: {e}"))?;
    }

    let mut handles = Vec::new();
    for i in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(async move {
            let id = format!("order-{i}");
            s.set_order_status(&id, OrderStatus::Preparing).await?;
            s.mark_paid(&id, T1).await
        }));
    }
    for handle in handles {
        handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
    }

    let orders = storage
        .list_orders(&OrderFilter::default())
        .await
        .map_err(|e| format!("list: {e}"))?;
    let done = orders
        .iter()
        .filter(|o| o.order_status == OrderStatus::Preparing && o.paid_at == Some(T1))
        .count();
    if done != N {
        return Err(format!("expected {N} updated orders, got {done}"));
    }
    Ok(())
}

// ── Admin grant racing a fraud mark ─────────────────────────────────────────

/// For each of N accounts, one task grants admin while another marks fraud.
/// Exactly one of the pair succeeds and no account ends up admin and fraud.
async fn racing_admin_grant_and_fraud_mark_never_combine<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    for i in 0..N {
        storage
            .upsert_account(make_profile(&format!("u{i}@x.com")), T0)
            .await
            .map_err(|e| format!("upsert: {e}"))?;
    }

    let mut handles = Vec::new();
    for i in 0..N {
        let grant = storage.clone();
        let mark = storage.clone();
        let email = format!("u{i}@x.com");
        let email2 = email.clone();
        handles.push(tokio::spawn(async move {
            grant.set_role(&email, Role::Admin, None, T1).await
        }));
        handles.push(tokio::spawn(async move {
            mark.set_status(&email2, AccountStatus::Fraud, T1).await
        }));
    }

    let mut succeeded = 0usize;
    for handle in handles {
        match handle.await.map_err(|e| format!("task panic: {e}"))? {
            Ok(_) => succeeded += 1,
            Err(StorageError::Conflict { .. }) => {}
            Err(e) => return Err(format!("storage error: {e}")),
        }
    }
    if succeeded != N {
        return Err(format!("expected {N} successful writes, got {succeeded}"));
    }

    for acct in storage
        .list_accounts()
        .await
        .map_err(|e| format!("list: {e}"))?
    {
        if acct.role == Role::Admin && acct.status == AccountStatus::Fraud {
            return Err(format!("{} is both admin and fraud", acct.email));
        }
    }
    Ok(())
}
