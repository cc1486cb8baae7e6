use std::future::Future;

use super::{make_profile, TestResult, T0, T1};
use crate::record::ProfileUpdate;
use crate::status::{AccountStatus, Role};
use crate::{Storage, StorageError};

pub(super) async fn run_account_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "account",
            "upsert_defaults_role_and_status_on_insert",
            upsert_defaults_role_and_status_on_insert(factory).await,
        ),
        TestResult::from_result(
            "account",
            "upsert_existing_keeps_role_status_and_created_at",
            upsert_existing_keeps_role_status_and_created_at(factory).await,
        ),
        TestResult::from_result(
            "account",
            "upsert_existing_ignores_absent_profile_fields",
            upsert_existing_ignores_absent_profile_fields(factory).await,
        ),
        TestResult::from_result(
            "account",
            "get_account_nonexistent",
            get_account_nonexistent(factory).await,
        ),
        TestResult::from_result(
            "account",
            "set_role_overwrites_role_and_chef_id",
            set_role_overwrites_role_and_chef_id(factory).await,
        ),
        TestResult::from_result(
            "account",
            "set_role_nonexistent",
            set_role_nonexistent(factory).await,
        ),
        TestResult::from_result(
            "account",
            "set_status_overwrites_status",
            set_status_overwrites_status(factory).await,
        ),
        TestResult::from_result(
            "account",
            "set_status_refuses_fraud_for_admin",
            set_status_refuses_fraud_for_admin(factory).await,
        ),
        TestResult::from_result(
            "account",
            "set_role_refuses_admin_for_fraud",
            set_role_refuses_admin_for_fraud(factory).await,
        ),
        TestResult::from_result(
            "account",
            "list_accounts_returns_every_account",
            list_accounts_returns_every_account(factory).await,
        ),
    ]
}

// ── Upsert ───────────────────────────────────────────────────────────────────

/// A first sync creates a plain active user with no chef id.
async fn upsert_defaults_role_and_status_on_insert<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let acct = s
        .upsert_account(make_profile("a@x.com"), T0)
        .await
        .map_err(|e| e.to_string())?;
    if acct.role != Role::User || acct.status != AccountStatus::Active {
        return Err(format!(
            "expected user/active, got {}/{}",
            acct.role, acct.status
        ));
    }
    if acct.chef_id.is_some() {
        return Err(format!("expected no chef id, got {:?}", acct.chef_id));
    }
    if acct.created_at != T0 || acct.updated_at != T0 {
        return Err("timestamps not set to insert time".to_string());
    }
    Ok(())
}

/// A later sync must not reset a role or status set by the workflow.
async fn upsert_existing_keeps_role_status_and_created_at<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.upsert_account(make_profile("a@x.com"), T0)
        .await
        .map_err(|e| e.to_string())?;
    s.set_role("a@x.com", Role::Chef, Some("chef-1234".to_string()), T0)
        .await
        .map_err(|e| e.to_string())?;
    s.set_status("a@x.com", AccountStatus::Fraud, T0)
        .await
        .map_err(|e| e.to_string())?;

    let mut profile = make_profile("a@x.com");
    profile.name = Some("Renamed".to_string());
    let acct = s
        .upsert_account(profile, T1)
        .await
        .map_err(|e| e.to_string())?;

    if acct.role != Role::Chef || acct.chef_id.as_deref() != Some("chef-1234") {
        return Err(format!(
            "sync reset role/chef id: {} {:?}",
            acct.role, acct.chef_id
        ));
    }
    if acct.status != AccountStatus::Fraud {
        return Err(format!("sync reset status to {}", acct.status));
    }
    if acct.name.as_deref() != Some("Renamed") {
        return Err(format!("name not updated: {:?}", acct.name));
    }
    if acct.created_at != T0 || acct.updated_at != T1 {
        return Err("expected created_at kept and updated_at bumped".to_string());
    }
    Ok(())
}

async fn upsert_existing_ignores_absent_profile_fields<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut profile = make_profile("a@x.com");
    profile.address = Some("1 Main St".to_string());
    s.upsert_account(profile, T0)
        .await
        .map_err(|e| e.to_string())?;

    let acct = s
        .upsert_account(
            ProfileUpdate {
                email: "a@x.com".to_string(),
                ..ProfileUpdate::default()
            },
            T1,
        )
        .await
        .map_err(|e| e.to_string())?;
    if acct.address.as_deref() != Some("1 Main St") || acct.name.is_none() {
        return Err(format!(
            "absent fields overwrote stored ones: {:?} {:?}",
            acct.name, acct.address
        ));
    }
    Ok(())
}

// ── Lookups and overwrites ───────────────────────────────────────────────────

async fn get_account_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.get_account("nobody@x.com").await {
        Err(StorageError::AccountNotFound { email }) if email == "nobody@x.com" => Ok(()),
        other => Err(format!("expected AccountNotFound, got {:?}", other)),
    }
}

async fn set_role_overwrites_role_and_chef_id<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.upsert_account(make_profile("a@x.com"), T0)
        .await
        .map_err(|e| e.to_string())?;
    s.set_role("a@x.com", Role::Chef, Some("chef-1111".to_string()), T0)
        .await
        .map_err(|e| e.to_string())?;
    let acct = s
        .set_role("a@x.com", Role::Admin, None, T1)
        .await
        .map_err(|e| e.to_string())?;
    if acct.role != Role::Admin || acct.chef_id.is_some() {
        return Err(format!("expected admin without chef id, got {:?}", acct));
    }
    let stored = s.get_account("a@x.com").await.map_err(|e| e.to_string())?;
    if stored != acct {
        return Err("returned record differs from stored record".to_string());
    }
    Ok(())
}

async fn set_role_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.set_role("ghost@x.com", Role::Chef, None, T0).await {
        Err(StorageError::AccountNotFound { .. }) => Ok(()),
        other => Err(format!("expected AccountNotFound, got {:?}", other)),
    }
}

async fn set_status_overwrites_status<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.upsert_account(make_profile("a@x.com"), T0)
        .await
        .map_err(|e| e.to_string())?;
    let acct = s
        .set_status("a@x.com", AccountStatus::Fraud, T1)
        .await
        .map_err(|e| e.to_string())?;
    if acct.status != AccountStatus::Fraud || acct.updated_at != T1 {
        return Err(format!("status not written: {:?}", acct));
    }
    Ok(())
}

// ── Admin / fraud exclusion ──────────────────────────────────────────────────

async fn set_status_refuses_fraud_for_admin<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.upsert_account(make_profile("root@x.com"), T0)
        .await
        .map_err(|e| e.to_string())?;
    s.set_role("root@x.com", Role::Admin, None, T0)
        .await
        .map_err(|e| e.to_string())?;

    match s.set_status("root@x.com", AccountStatus::Fraud, T1).await {
        Err(StorageError::Conflict { email, .. }) if email == "root@x.com" => {}
        other => return Err(format!("expected Conflict, got {:?}", other)),
    }
    let stored = s.get_account("root@x.com").await.map_err(|e| e.to_string())?;
    if stored.status != AccountStatus::Active || stored.updated_at != T0 {
        return Err(format!("refused write still changed the account: {:?}", stored));
    }
    Ok(())
}

async fn set_role_refuses_admin_for_fraud<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.upsert_account(make_profile("u@x.com"), T0)
        .await
        .map_err(|e| e.to_string())?;
    s.set_status("u@x.com", AccountStatus::Fraud, T0)
        .await
        .map_err(|e| e.to_string())?;

    match s.set_role("u@x.com", Role::Admin, None, T1).await {
        Err(StorageError::Conflict { .. }) => {}
        other => return Err(format!("expected Conflict, got {:?}", other)),
    }
    if s.get_account("u@x.com").await.map_err(|e| e.to_string())?.role != Role::User {
        return Err("refused write still changed the role".to_string());
    }

    // Other roles stay grantable.
    let acct = s
        .set_role("u@x.com", Role::Chef, Some("chef-1234".to_string()), T1)
        .await
        .map_err(|e| e.to_string())?;
    if acct.role != Role::Chef || acct.status != AccountStatus::Fraud {
        return Err(format!("expected fraud-marked chef, got {:?}", acct));
    }
    Ok(())
}

async fn list_accounts_returns_every_account<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for email in ["a@x.com", "b@x.com", "c@x.com"] {
        s.upsert_account(make_profile(email), T0)
            .await
            .map_err(|e| e.to_string())?;
    }
    let mut emails: Vec<String> = s
        .list_accounts()
        .await
        .map_err(|e| e.to_string())?
        .into_iter()
        .map(|a| a.email)
        .collect();
    emails.sort();
    if emails != ["a@x.com", "b@x.com", "c@x.com"] {
        return Err(format!("unexpected account list: {:?}", emails));
    }
    Ok(())
}
