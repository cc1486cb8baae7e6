//! Aggregates for the admin dashboard.

use chefmarket_storage::{Account, AccountStatus, Order, OrderStatus, PaymentStatus, Role};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_users: usize,
    pub total_chefs: usize,
    pub total_admins: usize,
    pub fraud_accounts: usize,
    pub total_orders: usize,
    /// Orders whose status is not terminal.
    pub pending_orders: usize,
    pub delivered_orders: usize,
    pub cancelled_orders: usize,
    pub paid_orders: usize,
    /// Sum of `price * quantity` over paid orders, saturating at `Decimal::MAX`.
    pub total_payment: Decimal,
}

pub fn compute(accounts: &[Account], orders: &[Order]) -> AdminStats {
    let mut stats = AdminStats {
        total_users: accounts.len(),
        total_orders: orders.len(),
        ..AdminStats::default()
    };

    for account in accounts {
        match account.role {
            Role::Chef => stats.total_chefs += 1,
            Role::Admin => stats.total_admins += 1,
            Role::User => {}
        }
        if account.status == AccountStatus::Fraud {
            stats.fraud_accounts += 1;
        }
    }

    for order in orders {
        match order.order_status {
            OrderStatus::Delivered => stats.delivered_orders += 1,
            OrderStatus::Cancelled => stats.cancelled_orders += 1,
            _ => stats.pending_orders += 1,
        }
        if order.payment_status == PaymentStatus::Paid {
            stats.paid_orders += 1;
            let total = order.total().unwrap_or(Decimal::MAX);
            stats.total_payment = stats.total_payment.saturating_add(total);
        }
    }

    stats
}
