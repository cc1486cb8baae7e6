//! Workflow coordinator: the only writer of `Account.role` / `Account.chef_id`
//! and the only component that couples the elevation request ledger to the
//! account store.
//!
//! # Approval sequence
//!
//! 1. Compare-and-set the request from `pending` to `approved`.
//! 2. Take `request_type` and `user_email` from the record the store returned.
//! 3. Write the account: `chef` gets a fresh `chef-NNNN` id, `admin` gets the
//!    role only.
//! 4. Mark the request `applied`.
//!
//! Steps 1 and 3 are separate writes to separate stores. If step 3 fails the
//! request stays approved with `applied == false` and the caller sees the
//! error; [`WorkflowCoordinator::reconcile`] completes such requests later.

use std::sync::Arc;

use chefmarket_storage::{
    Account, AccountStatus, ElevationRequest, Order, OrderFilter, OrderStatus, PaymentStatus,
    ProfileUpdate, RequestStatus, RequestType, Role, StorageError,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::chef_id::generate_chef_id;
use crate::error::WorkflowError;
use crate::gate::Caller;
use crate::provider::PaymentProvider;
use crate::stats::{self, AdminStats};
use crate::Stores;

/// Checkout input. The buyer is always the authorized caller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub chef_id: String,
    pub meal_id: String,
    #[serde(default)]
    pub meal_name: Option<String>,
    #[serde(default)]
    pub delivery_address: Option<String>,
    pub price: Decimal,
    pub quantity: u32,
}

/// A created payment intent, as handed back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub client_secret: String,
    pub amount_minor: i64,
    pub currency: String,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub examined: usize,
    pub applied: usize,
    pub failed: usize,
}

pub struct WorkflowCoordinator {
    stores: Stores,
    payments: Arc<dyn PaymentProvider>,
    currency: String,
}

impl WorkflowCoordinator {
    pub fn new(
        stores: Stores,
        payments: Arc<dyn PaymentProvider>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            stores,
            payments,
            currency: currency.into(),
        }
    }

    // ── Accounts ─────────────────────────────────────────────────────────────

    /// Upsert the caller's account. Role and status are defaulted on insert only.
    pub async fn sync_profile(&self, profile: ProfileUpdate) -> Result<Account, WorkflowError> {
        if profile.email.trim().is_empty() {
            return Err(WorkflowError::Validation("email must not be empty".to_string()));
        }
        let account = self
            .stores
            .accounts
            .upsert_account(profile, OffsetDateTime::now_utc())
            .await?;
        debug!(email = %account.email, role = %account.role, "profile synced");
        Ok(account)
    }

    pub async fn role_of(&self, email: &str) -> Result<Role, WorkflowError> {
        Ok(self.stores.accounts.get_account(email).await?.role)
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, WorkflowError> {
        Ok(self.stores.accounts.list_accounts().await?)
    }

    /// Mark `target_email` as fraud. Admin accounts can never be marked; the
    /// attempt fails with `InvalidTransition` and leaves the account untouched.
    ///
    /// The role check happens inside the store write, so a concurrent admin
    /// grant cannot slip between the check and the mark.
    pub async fn mark_fraud(
        &self,
        target_email: &str,
        acting: &Caller,
    ) -> Result<Account, WorkflowError> {
        require_admin(acting)?;
        let target = self.stores.accounts.get_account(target_email).await?;
        if target.status == AccountStatus::Fraud {
            return Ok(target);
        }
        match self
            .stores
            .accounts
            .set_status(target_email, AccountStatus::Fraud, OffsetDateTime::now_utc())
            .await
        {
            Ok(account) => {
                info!(admin = %acting.email, target_email, "account marked as fraud");
                Ok(account)
            }
            Err(StorageError::Conflict { .. }) => {
                warn!(admin = %acting.email, target_email, "refused to mark an admin as fraud");
                Err(WorkflowError::InvalidTransition(format!(
                    "admin account '{target_email}' cannot be marked as fraud"
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    // ── Elevation requests ───────────────────────────────────────────────────

    pub async fn submit_request(
        &self,
        caller: &Caller,
        request_type: RequestType,
    ) -> Result<ElevationRequest, WorkflowError> {
        let request = ElevationRequest {
            id: uuid::Uuid::new_v4().to_string(),
            user_email: caller.email.clone(),
            request_type,
            request_status: RequestStatus::Pending,
            request_time: OffsetDateTime::now_utc(),
            decided_at: None,
            applied: false,
        };
        self.stores.requests.insert_request(request.clone()).await?;
        info!(request_id = %request.id, email = %request.user_email, %request_type, "elevation request submitted");
        Ok(request)
    }

    pub async fn list_requests(&self) -> Result<Vec<ElevationRequest>, WorkflowError> {
        Ok(self.stores.requests.list_requests().await?)
    }

    /// Approve or reject a pending request.
    ///
    /// A request that is already approved or rejected is returned unchanged,
    /// whatever the target. An approval then elevates the requester's account.
    /// An admin approval for a fraud-marked requester is refused with
    /// `InvalidTransition` and the request stays pending.
    pub async fn transition_request(
        &self,
        request_id: &str,
        target: RequestStatus,
        acting: &Caller,
    ) -> Result<ElevationRequest, WorkflowError> {
        require_admin(acting)?;
        if !target.is_terminal() {
            return Err(WorkflowError::Validation(format!(
                "request status can only move to approved or rejected, not '{target}'"
            )));
        }

        if target == RequestStatus::Approved {
            self.refuse_admin_grant_to_fraud(request_id, acting).await?;
        }

        let outcome = self
            .stores
            .requests
            .decide_request(request_id, target, OffsetDateTime::now_utc())
            .await?;
        if !outcome.transitioned {
            info!(
                request_id,
                status = %outcome.request.request_status,
                "request already decided; leaving it unchanged"
            );
            return Ok(outcome.request);
        }
        info!(request_id, admin = %acting.email, status = %target, "request decided");

        if target == RequestStatus::Rejected {
            return Ok(outcome.request);
        }

        let request = outcome.request;
        if let Err(e) = self.apply_elevation(&request, false).await {
            warn!(
                request_id,
                email = %request.user_email,
                error = %e,
                "request approved but account not elevated; awaiting reconciliation"
            );
            return Err(e);
        }
        Ok(self.stores.requests.mark_applied(request_id).await?)
    }

    /// Fails when `request_id` is a pending admin request from a fraud-marked
    /// account. A requester with no account yet passes; the grant is retried
    /// by reconciliation once the profile exists.
    async fn refuse_admin_grant_to_fraud(
        &self,
        request_id: &str,
        acting: &Caller,
    ) -> Result<(), WorkflowError> {
        let request = self.stores.requests.get_request(request_id).await?;
        if request.request_status != RequestStatus::Pending
            || request.request_type != RequestType::Admin
        {
            return Ok(());
        }
        match self.stores.accounts.get_account(&request.user_email).await {
            Ok(account) if account.status == AccountStatus::Fraud => {
                warn!(
                    request_id,
                    admin = %acting.email,
                    email = %request.user_email,
                    "refused admin grant to a fraud-marked account"
                );
                Err(WorkflowError::InvalidTransition(format!(
                    "fraud-marked account '{}' cannot be granted admin",
                    request.user_email
                )))
            }
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Finish approvals whose account mutation never landed.
    ///
    /// Accounts that already hold the granted role keep their existing chef id.
    pub async fn reconcile(&self) -> Result<ReconcileReport, WorkflowError> {
        let stuck = self.stores.requests.list_unapplied_approvals().await?;
        let mut report = ReconcileReport {
            examined: stuck.len(),
            ..ReconcileReport::default()
        };

        for request in stuck {
            let result = match self.apply_elevation(&request, true).await {
                Ok(_) => self
                    .stores
                    .requests
                    .mark_applied(&request.id)
                    .await
                    .map_err(WorkflowError::from),
                Err(e) => Err(e),
            };
            match result {
                Ok(_) => {
                    report.applied += 1;
                    info!(request_id = %request.id, email = %request.user_email, "reconciled approval");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(request_id = %request.id, error = %e, "reconciliation failed");
                }
            }
        }
        Ok(report)
    }

    /// Write the role granted by an approved request.
    ///
    /// With `keep_existing` set, an account that already holds the granted
    /// role is left as it is.
    async fn apply_elevation(
        &self,
        request: &ElevationRequest,
        keep_existing: bool,
    ) -> Result<Account, WorkflowError> {
        let accounts = &self.stores.accounts;
        let email = request.user_email.as_str();
        let now = OffsetDateTime::now_utc();

        if keep_existing {
            let current = accounts.get_account(email).await?;
            let granted = request.request_type.granted_role();
            let complete = match granted {
                Role::Chef => current.chef_id.is_some(),
                _ => true,
            };
            if current.role == granted && complete {
                return Ok(current);
            }
        }

        let account = match request.request_type {
            RequestType::Chef => {
                let chef_id = generate_chef_id(&mut rand::thread_rng());
                accounts
                    .set_role(email, Role::Chef, Some(chef_id), now)
                    .await?
            }
            RequestType::Admin => accounts.set_role(email, Role::Admin, None, now).await?,
        };
        info!(
            email,
            role = %account.role,
            chef_id = account.chef_id.as_deref().unwrap_or("-"),
            "account elevated"
        );
        Ok(account)
    }

    // ── Orders ───────────────────────────────────────────────────────────────

    /// Create an order for `caller` with `pending` / `Pending` status.
    /// The chef id is stored as given; it is not checked against any account.
    pub async fn place_order(&self, caller: &Caller, new: NewOrder) -> Result<Order, WorkflowError> {
        if new.price <= Decimal::ZERO {
            return Err(WorkflowError::Validation("price must be positive".to_string()));
        }
        if new.quantity == 0 {
            return Err(WorkflowError::Validation("quantity must be at least 1".to_string()));
        }
        if new.chef_id.trim().is_empty() || new.meal_id.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "chefId and mealId are required".to_string(),
            ));
        }
        if new.price.checked_mul(Decimal::from(new.quantity)).is_none() {
            return Err(WorkflowError::Validation("order total is out of range".to_string()));
        }

        let order = Order {
            id: uuid::Uuid::new_v4().to_string(),
            user_email: caller.email.clone(),
            chef_id: new.chef_id,
            meal_id: new.meal_id,
            meal_name: new.meal_name,
            delivery_address: new.delivery_address,
            price: new.price,
            quantity: new.quantity,
            order_status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            order_time: OffsetDateTime::now_utc(),
            paid_at: None,
        };
        self.stores.orders.insert_order(order.clone()).await?;
        info!(order_id = %order.id, buyer = %order.user_email, chef_id = %order.chef_id, "order placed");
        Ok(order)
    }

    /// Overwrite the fulfillment status. No transition table is enforced.
    pub async fn set_fulfillment_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<Order, WorkflowError> {
        let order = self.stores.orders.set_order_status(order_id, status).await?;
        info!(order_id, status = %status, "order status updated");
        Ok(order)
    }

    /// Mark an order paid. Idempotent. The caller is trusted to have
    /// completed the provider's payment flow first.
    pub async fn mark_paid(&self, order_id: &str) -> Result<Order, WorkflowError> {
        let order = self
            .stores
            .orders
            .mark_paid(order_id, OffsetDateTime::now_utc())
            .await?;
        info!(order_id, "order marked paid");
        Ok(order)
    }

    pub async fn orders_for_buyer(&self, email: &str) -> Result<Vec<Order>, WorkflowError> {
        Ok(self
            .stores
            .orders
            .list_orders(&OrderFilter::buyer(email))
            .await?)
    }

    pub async fn orders_for_chef(&self, chef_id: &str) -> Result<Vec<Order>, WorkflowError> {
        Ok(self
            .stores
            .orders
            .list_orders(&OrderFilter::chef(chef_id))
            .await?)
    }

    // ── Admin & payments ─────────────────────────────────────────────────────

    pub async fn admin_stats(&self) -> Result<AdminStats, WorkflowError> {
        let accounts = self.stores.accounts.list_accounts().await?;
        let orders = self
            .stores
            .orders
            .list_orders(&OrderFilter::default())
            .await?;
        Ok(stats::compute(&accounts, &orders))
    }

    /// Ask the payment provider for an intent covering `amount` (major units).
    pub async fn create_payment_intent(
        &self,
        amount: Decimal,
    ) -> Result<PaymentIntent, WorkflowError> {
        let amount_minor = to_minor_units(amount)?;
        let client_secret = self
            .payments
            .create_intent(amount_minor, &self.currency)
            .await?;
        debug!(
            provider = self.payments.provider_id(),
            amount_minor,
            currency = %self.currency,
            "payment intent created"
        );
        Ok(PaymentIntent {
            client_secret,
            amount_minor,
            currency: self.currency.clone(),
        })
    }
}

fn require_admin(acting: &Caller) -> Result<(), WorkflowError> {
    if acting.is_admin() {
        Ok(())
    } else {
        Err(WorkflowError::Forbidden("requires role 'admin'".to_string()))
    }
}

/// Convert a positive major-unit amount to minor units, rounding to the
/// nearest cent.
fn to_minor_units(amount: Decimal) -> Result<i64, WorkflowError> {
    if amount <= Decimal::ZERO {
        return Err(WorkflowError::Validation("amount must be positive".to_string()));
    }
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|minor| minor.round().to_i64())
        .ok_or_else(|| WorkflowError::Validation(format!("amount {amount} is out of range")))
}
