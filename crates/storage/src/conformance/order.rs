use std::future::Future;

use super::{make_order, TestResult, T0, T1, T2};
use crate::record::OrderFilter;
use crate::status::{OrderStatus, PaymentStatus};
use crate::{Storage, StorageError};

pub(super) async fn run_order_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "order",
            "insert_then_get_round_trips",
            insert_then_get_round_trips(factory).await,
        ),
        TestResult::from_result(
            "order",
            "get_order_nonexistent",
            get_order_nonexistent(factory).await,
        ),
        TestResult::from_result(
            "order",
            "list_orders_applies_filter",
            list_orders_applies_filter(factory).await,
        ),
        TestResult::from_result(
            "order",
            "set_order_status_overwrites_any_value",
            set_order_status_overwrites_any_value(factory).await,
        ),
        TestResult::from_result(
            "order",
            "mark_paid_is_one_way_and_idempotent",
            mark_paid_is_one_way_and_idempotent(factory).await,
        ),
        TestResult::from_result(
            "order",
            "mark_paid_nonexistent",
            mark_paid_nonexistent(factory).await,
        ),
    ]
}

async fn insert_then_get_round_trips<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let order = make_order("order-1", "b@x.com", "chef-1234");
    s.insert_order(order.clone())
        .await
        .map_err(|e| e.to_string())?;
    let stored = s.get_order("order-1").await.map_err(|e| e.to_string())?;
    if stored != order {
        return Err(format!("stored order differs: {:?}", stored));
    }
    match s.insert_order(order).await {
        Err(StorageError::AlreadyExists { .. }) => Ok(()),
        other => Err(format!("expected AlreadyExists on duplicate, got {:?}", other)),
    }
}

async fn get_order_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.get_order("order-missing").await {
        Err(StorageError::OrderNotFound { order_id }) if order_id == "order-missing" => Ok(()),
        other => Err(format!("expected OrderNotFound, got {:?}", other)),
    }
}

async fn list_orders_applies_filter<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut older = make_order("order-1", "b@x.com", "chef-1111");
    older.order_time = T0;
    let mut newer = make_order("order-2", "b@x.com", "chef-2222");
    newer.order_time = T1;
    let other_buyer = make_order("order-3", "c@x.com", "chef-1111");
    for o in [older, newer, other_buyer] {
        s.insert_order(o).await.map_err(|e| e.to_string())?;
    }

    let buyer: Vec<String> = s
        .list_orders(&OrderFilter::buyer("b@x.com"))
        .await
        .map_err(|e| e.to_string())?
        .into_iter()
        .map(|o| o.id)
        .collect();
    if buyer != ["order-2", "order-1"] {
        return Err(format!("expected buyer orders newest first, got {:?}", buyer));
    }

    let mut chef: Vec<String> = s
        .list_orders(&OrderFilter::chef("chef-1111"))
        .await
        .map_err(|e| e.to_string())?
        .into_iter()
        .map(|o| o.id)
        .collect();
    chef.sort();
    if chef != ["order-1", "order-3"] {
        return Err(format!("unexpected chef orders: {:?}", chef));
    }

    let all = s
        .list_orders(&OrderFilter::default())
        .await
        .map_err(|e| e.to_string())?;
    if all.len() != 3 {
        return Err(format!("expected 3 orders, got {}", all.len()));
    }
    Ok(())
}

/// Fulfillment status has no transition table: even a terminal status can be
/// overwritten.
async fn set_order_status_overwrites_any_value<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert_order(make_order("order-1", "b@x.com", "chef-1234"))
        .await
        .map_err(|e| e.to_string())?;
    for status in [
        OrderStatus::Delivered,
        OrderStatus::Preparing,
        OrderStatus::Cancelled,
    ] {
        let order = s
            .set_order_status("order-1", status)
            .await
            .map_err(|e| e.to_string())?;
        if order.order_status != status {
            return Err(format!("expected {status}, got {}", order.order_status));
        }
        if order.payment_status != PaymentStatus::Pending {
            return Err("status overwrite touched payment status".to_string());
        }
    }
    Ok(())
}

async fn mark_paid_is_one_way_and_idempotent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert_order(make_order("order-1", "b@x.com", "chef-1234"))
        .await
        .map_err(|e| e.to_string())?;
    let paid = s
        .mark_paid("order-1", T1)
        .await
        .map_err(|e| e.to_string())?;
    if paid.payment_status != PaymentStatus::Paid || paid.paid_at != Some(T1) {
        return Err(format!("order not marked paid: {:?}", paid));
    }
    let again = s
        .mark_paid("order-1", T2)
        .await
        .map_err(|e| e.to_string())?;
    if again != paid {
        return Err(format!("second mark_paid changed the record: {:?}", again));
    }
    let after_status = s
        .set_order_status("order-1", OrderStatus::Cancelled)
        .await
        .map_err(|e| e.to_string())?;
    if after_status.payment_status != PaymentStatus::Paid {
        return Err("payment status regressed after a status change".to_string());
    }
    Ok(())
}

async fn mark_paid_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: Storage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.mark_paid("order-missing", T1).await {
        Err(StorageError::OrderNotFound { .. }) => Ok(()),
        other => Err(format!("expected OrderNotFound, got {:?}", other)),
    }
}
