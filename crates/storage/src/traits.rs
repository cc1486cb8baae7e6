use async_trait::async_trait;
use time::OffsetDateTime;

use crate::error::StorageError;
use crate::record::{Account, ElevationRequest, Order, OrderFilter, ProfileUpdate};
use crate::status::{AccountStatus, OrderStatus, RequestStatus, Role};

/// Repository for [`Account`] records, keyed by email.
///
/// Every mutating method is a single atomic read-modify-write against one
/// record. Implementations must be `Send + Sync + 'static` so they can be
/// shared through axum application state and across tasks.
#[async_trait]
pub trait AccountStore: Send + Sync + 'static {
    /// Insert or update an account from a profile sync.
    ///
    /// On insert the account starts as `Role::User` / `AccountStatus::Active`
    /// with `created_at = now`. On update only the profile fields that are
    /// `Some` and `updated_at` are written; role, status and chef id are left
    /// untouched.
    async fn upsert_account(
        &self,
        profile: ProfileUpdate,
        now: OffsetDateTime,
    ) -> Result<Account, StorageError>;

    /// Returns `Err(StorageError::AccountNotFound)` if no account has this email.
    async fn get_account(&self, email: &str) -> Result<Account, StorageError>;

    /// All accounts, oldest first.
    async fn list_accounts(&self) -> Result<Vec<Account>, StorageError>;

    /// Overwrite role and chef id.
    ///
    /// Granting `Role::Admin` to a fraud-marked account fails with
    /// `StorageError::Conflict`; the check and the write are one atomic step.
    async fn set_role(
        &self,
        email: &str,
        role: Role,
        chef_id: Option<String>,
        now: OffsetDateTime,
    ) -> Result<Account, StorageError>;

    /// Overwrite the account status.
    ///
    /// Marking an admin account as fraud fails with `StorageError::Conflict`
    /// under the same atomicity as [`AccountStore::set_role`].
    async fn set_status(
        &self,
        email: &str,
        status: AccountStatus,
        now: OffsetDateTime,
    ) -> Result<Account, StorageError>;
}

/// Result of a compare-and-set on an elevation request's status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    /// The record as stored after the call.
    pub request: ElevationRequest,
    /// `false` when the request was already terminal and nothing was written.
    pub transitioned: bool,
}

/// Append-and-transition ledger of [`ElevationRequest`] records.
#[async_trait]
pub trait ElevationRequestStore: Send + Sync + 'static {
    /// Append a new request. Returns `Err(StorageError::AlreadyExists)` on a
    /// duplicate id.
    async fn insert_request(&self, request: ElevationRequest) -> Result<(), StorageError>;

    /// Returns `Err(StorageError::RequestNotFound)` if the id is unknown.
    async fn get_request(&self, request_id: &str) -> Result<ElevationRequest, StorageError>;

    /// All requests, oldest first.
    async fn list_requests(&self) -> Result<Vec<ElevationRequest>, StorageError>;

    /// Move a request out of `Pending` into `status`.
    ///
    /// Atomic: the pending check and the write happen under one record lock,
    /// so of several concurrent callers exactly one observes
    /// `transitioned == true`. A request that is already terminal is returned
    /// unchanged.
    async fn decide_request(
        &self,
        request_id: &str,
        status: RequestStatus,
        now: OffsetDateTime,
    ) -> Result<TransitionOutcome, StorageError>;

    /// Record that the account mutation for an approval has been written.
    async fn mark_applied(&self, request_id: &str) -> Result<ElevationRequest, StorageError>;

    /// Approved requests whose account mutation has not been recorded yet.
    async fn list_unapplied_approvals(&self) -> Result<Vec<ElevationRequest>, StorageError>;
}

/// Ledger of [`Order`] records.
#[async_trait]
pub trait OrderStore: Send + Sync + 'static {
    /// Returns `Err(StorageError::AlreadyExists)` on a duplicate id.
    async fn insert_order(&self, order: Order) -> Result<(), StorageError>;

    /// Returns `Err(StorageError::OrderNotFound)` if the id is unknown.
    async fn get_order(&self, order_id: &str) -> Result<Order, StorageError>;

    /// Orders matching `filter`, newest first.
    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StorageError>;

    /// Unconditionally overwrite the fulfillment status.
    async fn set_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<Order, StorageError>;

    /// Set the payment status to paid. Calling it on an already-paid order
    /// leaves the record as it is (including the original `paid_at`).
    async fn mark_paid(&self, order_id: &str, now: OffsetDateTime) -> Result<Order, StorageError>;
}

/// A backend that provides all three stores.
pub trait Storage: AccountStore + ElevationRequestStore + OrderStore {}

impl<T> Storage for T where T: AccountStore + ElevationRequestStore + OrderStore {}
