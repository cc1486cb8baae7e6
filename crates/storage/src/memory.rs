//! In-memory document store.
//!
//! Each collection sits behind its own `tokio::sync::RwLock`; every write takes
//! the collection's write lock for the whole read-modify-write, which gives the
//! single-record atomicity the store traits promise.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::record::{Account, ElevationRequest, Order, OrderFilter, ProfileUpdate};
use crate::status::{AccountStatus, OrderStatus, PaymentStatus, RequestStatus, Role};
use crate::traits::{AccountStore, ElevationRequestStore, OrderStore, TransitionOutcome};

#[derive(Debug, Default)]
pub struct MemoryStorage {
    accounts: RwLock<HashMap<String, Account>>,
    requests: RwLock<HashMap<String, ElevationRequest>>,
    orders: RwLock<HashMap<String, Order>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn account_not_found(email: &str) -> StorageError {
    StorageError::AccountNotFound {
        email: email.to_string(),
    }
}

fn request_not_found(request_id: &str) -> StorageError {
    StorageError::RequestNotFound {
        request_id: request_id.to_string(),
    }
}

fn order_not_found(order_id: &str) -> StorageError {
    StorageError::OrderNotFound {
        order_id: order_id.to_string(),
    }
}

#[async_trait]
impl AccountStore for MemoryStorage {
    async fn upsert_account(
        &self,
        profile: ProfileUpdate,
        now: OffsetDateTime,
    ) -> Result<Account, StorageError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .entry(profile.email.clone())
            .and_modify(|existing| {
                if profile.name.is_some() {
                    existing.name = profile.name.clone();
                }
                if profile.photo_url.is_some() {
                    existing.photo_url = profile.photo_url.clone();
                }
                if profile.address.is_some() {
                    existing.address = profile.address.clone();
                }
                existing.updated_at = now;
            })
            .or_insert_with(|| Account {
                email: profile.email.clone(),
                name: profile.name.clone(),
                photo_url: profile.photo_url.clone(),
                address: profile.address.clone(),
                role: Role::User,
                status: AccountStatus::Active,
                chef_id: None,
                created_at: now,
                updated_at: now,
            });
        Ok(account.clone())
    }

    async fn get_account(&self, email: &str) -> Result<Account, StorageError> {
        self.accounts
            .read()
            .await
            .get(email)
            .cloned()
            .ok_or_else(|| account_not_found(email))
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StorageError> {
        let mut all: Vec<Account> = self.accounts.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.email.cmp(&b.email)));
        Ok(all)
    }

    async fn set_role(
        &self,
        email: &str,
        role: Role,
        chef_id: Option<String>,
        now: OffsetDateTime,
    ) -> Result<Account, StorageError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(email)
            .ok_or_else(|| account_not_found(email))?;
        if role == Role::Admin && account.status == AccountStatus::Fraud {
            return Err(StorageError::Conflict {
                email: email.to_string(),
                reason: "fraud-marked accounts cannot become admin",
            });
        }
        account.role = role;
        account.chef_id = chef_id;
        account.updated_at = now;
        Ok(account.clone())
    }

    async fn set_status(
        &self,
        email: &str,
        status: AccountStatus,
        now: OffsetDateTime,
    ) -> Result<Account, StorageError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(email)
            .ok_or_else(|| account_not_found(email))?;
        if status == AccountStatus::Fraud && account.role == Role::Admin {
            return Err(StorageError::Conflict {
                email: email.to_string(),
                reason: "admin accounts cannot be marked as fraud",
            });
        }
        account.status = status;
        account.updated_at = now;
        Ok(account.clone())
    }
}

#[async_trait]
impl ElevationRequestStore for MemoryStorage {
    async fn insert_request(&self, request: ElevationRequest) -> Result<(), StorageError> {
        let mut requests = self.requests.write().await;
        if requests.contains_key(&request.id) {
            return Err(StorageError::AlreadyExists {
                kind: "elevation request",
                id: request.id,
            });
        }
        requests.insert(request.id.clone(), request);
        Ok(())
    }

    async fn get_request(&self, request_id: &str) -> Result<ElevationRequest, StorageError> {
        self.requests
            .read()
            .await
            .get(request_id)
            .cloned()
            .ok_or_else(|| request_not_found(request_id))
    }

    async fn list_requests(&self) -> Result<Vec<ElevationRequest>, StorageError> {
        let mut all: Vec<ElevationRequest> =
            self.requests.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.request_time.cmp(&b.request_time).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn decide_request(
        &self,
        request_id: &str,
        status: RequestStatus,
        now: OffsetDateTime,
    ) -> Result<TransitionOutcome, StorageError> {
        let mut requests = self.requests.write().await;
        let request = requests
            .get_mut(request_id)
            .ok_or_else(|| request_not_found(request_id))?;

        if request.request_status.is_terminal() || !status.is_terminal() {
            return Ok(TransitionOutcome {
                request: request.clone(),
                transitioned: false,
            });
        }

        request.request_status = status;
        request.decided_at = Some(now);
        Ok(TransitionOutcome {
            request: request.clone(),
            transitioned: true,
        })
    }

    async fn mark_applied(&self, request_id: &str) -> Result<ElevationRequest, StorageError> {
        let mut requests = self.requests.write().await;
        let request = requests
            .get_mut(request_id)
            .ok_or_else(|| request_not_found(request_id))?;
        request.applied = true;
        Ok(request.clone())
    }

    async fn list_unapplied_approvals(&self) -> Result<Vec<ElevationRequest>, StorageError> {
        let mut stuck: Vec<ElevationRequest> = self
            .requests
            .read()
            .await
            .values()
            .filter(|r| r.awaiting_reconciliation())
            .cloned()
            .collect();
        stuck.sort_by(|a, b| a.request_time.cmp(&b.request_time).then(a.id.cmp(&b.id)));
        Ok(stuck)
    }
}

#[async_trait]
impl OrderStore for MemoryStorage {
    async fn insert_order(&self, order: Order) -> Result<(), StorageError> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(StorageError::AlreadyExists {
                kind: "order",
                id: order.id,
            });
        }
        orders.insert(order.id.clone(), order);
        Ok(())
    }

    async fn get_order(&self, order_id: &str) -> Result<Order, StorageError> {
        self.orders
            .read()
            .await
            .get(order_id)
            .cloned()
            .ok_or_else(|| order_not_found(order_id))
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StorageError> {
        let mut matching: Vec<Order> = self
            .orders
            .read()
            .await
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.order_time.cmp(&a.order_time).then(a.id.cmp(&b.id)));
        Ok(matching)
    }

    async fn set_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<Order, StorageError> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| order_not_found(order_id))?;
        order.order_status = status;
        Ok(order.clone())
    }

    async fn mark_paid(&self, order_id: &str, now: OffsetDateTime) -> Result<Order, StorageError> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| order_not_found(order_id))?;
        if order.payment_status != PaymentStatus::Paid {
            order.payment_status = PaymentStatus::Paid;
            order.paid_at = Some(now);
        }
        Ok(order.clone())
    }
}
