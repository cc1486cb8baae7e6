use std::future::Future;

use super::{make_request, TestResult, T1, T2};
use crate::status::{RequestStatus, RequestType};
use crate::{Storage, StorageError};

pub(super) async fn run_request_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "request",
            "insert_then_get_returns_pending_request",
            insert_then_get_returns_pending_request(factory).await,
        ),
        TestResult::from_result(
            "request",
            "duplicate_insert_returns_already_exists",
            duplicate_insert_returns_already_exists(factory).await,
        ),
        TestResult::from_result(
            "request",
            "get_request_nonexistent",
            get_request_nonexistent(factory).await,
        ),
        TestResult::from_result(
            "request",
            "decide_pending_request_transitions",
            decide_pending_request_transitions(factory).await,
        ),
        TestResult::from_result(
            "request",
            "decide_terminal_request_is_noop",
            decide_terminal_request_is_noop(factory).await,
        ),
        TestResult::from_result(
            "request",
            "decide_nonexistent_request",
            decide_nonexistent_request(factory).await,
        ),
        TestResult::from_result(
            "request",
            "unapplied_approvals_listed_until_marked",
            unapplied_approvals_listed_until_marked(factory).await,
        ),
    ]
}

async fn insert_then_get_returns_pending_request<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let req = make_request("req-1", "a@x.com", RequestType::Chef);
    s.insert_request(req.clone())
        .await
        .map_err(|e| e.to_string())?;
    let stored = s.get_request("req-1").await.map_err(|e| e.to_string())?;
    if stored != req {
        return Err(format!("stored request differs: {:?}", stored));
    }
    let listed = s.list_requests().await.map_err(|e| e.to_string())?;
    if listed.len() != 1 {
        return Err(format!("expected 1 listed request, got {}", listed.len()));
    }
    Ok(())
}

async fn duplicate_insert_returns_already_exists<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let req = make_request("req-1", "a@x.com", RequestType::Chef);
    s.insert_request(req.clone())
        .await
        .map_err(|e| e.to_string())?;
    match s.insert_request(req).await {
        Err(StorageError::AlreadyExists { .. }) => Ok(()),
        other => Err(format!("expected AlreadyExists, got {:?}", other)),
    }
}

async fn get_request_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.get_request("req-missing").await {
        Err(StorageError::RequestNotFound { request_id }) if request_id == "req-missing" => Ok(()),
        other => Err(format!("expected RequestNotFound, got {:?}", other)),
    }
}

async fn decide_pending_request_transitions<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert_request(make_request("req-1", "a@x.com", RequestType::Admin))
        .await
        .map_err(|e| e.to_string())?;
    let outcome = s
        .decide_request("req-1", RequestStatus::Rejected, T1)
        .await
        .map_err(|e| e.to_string())?;
    if !outcome.transitioned {
        return Err("pending request did not transition".to_string());
    }
    if outcome.request.request_status != RequestStatus::Rejected
        || outcome.request.decided_at != Some(T1)
    {
        return Err(format!("unexpected record: {:?}", outcome.request));
    }
    Ok(())
}

/// Once approved or rejected, a request never changes again.
async fn decide_terminal_request_is_noop<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert_request(make_request("req-1", "a@x.com", RequestType::Chef))
        .await
        .map_err(|e| e.to_string())?;
    let first = s
        .decide_request("req-1", RequestStatus::Approved, T1)
        .await
        .map_err(|e| e.to_string())?;

    for target in [RequestStatus::Rejected, RequestStatus::Approved] {
        let again = s
            .decide_request("req-1", target, T2)
            .await
            .map_err(|e| e.to_string())?;
        if again.transitioned {
            return Err(format!("terminal request re-transitioned to {target}"));
        }
        if again.request != first.request {
            return Err(format!("terminal request changed: {:?}", again.request));
        }
    }
    Ok(())
}

async fn decide_nonexistent_request<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s
        .decide_request("req-missing", RequestStatus::Approved, T1)
        .await
    {
        Err(StorageError::RequestNotFound { .. }) => Ok(()),
        other => Err(format!("expected RequestNotFound, got {:?}", other)),
    }
}

async fn unapplied_approvals_listed_until_marked<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for (id, status) in [
        ("req-approved", RequestStatus::Approved),
        ("req-rejected", RequestStatus::Rejected),
    ] {
        s.insert_request(make_request(id, "a@x.com", RequestType::Chef))
            .await
            .map_err(|e| e.to_string())?;
        s.decide_request(id, status, T1)
            .await
            .map_err(|e| e.to_string())?;
    }
    s.insert_request(make_request("req-pending", "b@x.com", RequestType::Chef))
        .await
        .map_err(|e| e.to_string())?;

    let stuck = s
        .list_unapplied_approvals()
        .await
        .map_err(|e| e.to_string())?;
    let ids: Vec<&str> = stuck.iter().map(|r| r.id.as_str()).collect();
    if ids != ["req-approved"] {
        return Err(format!("expected only req-approved, got {:?}", ids));
    }

    let marked = s
        .mark_applied("req-approved")
        .await
        .map_err(|e| e.to_string())?;
    if !marked.applied {
        return Err("mark_applied did not set the marker".to_string());
    }
    let stuck = s
        .list_unapplied_approvals()
        .await
        .map_err(|e| e.to_string())?;
    if !stuck.is_empty() {
        return Err(format!("expected no stuck requests, got {}", stuck.len()));
    }
    Ok(())
}
