//! Role-transition and order-lifecycle workflow for the chefmarket backend.
//!
//! Requests flow through two components:
//!
//! 1. [`AuthorizationGate`] loads the caller's account for a
//!    [`VerifiedIdentity`] and checks a [`Capability`].
//! 2. [`WorkflowCoordinator`] runs the requested transition against the
//!    elevation request ledger or the order ledger and, for approvals, writes
//!    the account's new role.
//!
//! Both are stateless over the injected [`Stores`].

pub mod chef_id;
pub mod coordinator;
pub mod error;
pub mod gate;
pub mod provider;
pub mod stats;

use std::sync::Arc;

use chefmarket_storage::{AccountStore, ElevationRequestStore, OrderStore, Storage};

pub use coordinator::{NewOrder, PaymentIntent, ReconcileReport, WorkflowCoordinator};
pub use error::WorkflowError;
pub use gate::{AuthorizationGate, Caller, Capability};
pub use provider::{IdentityVerifier, PaymentProvider, ProviderError, VerifiedIdentity};
pub use stats::AdminStats;

/// Handles to the three stores, constructed once at process start.
#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn AccountStore>,
    pub requests: Arc<dyn ElevationRequestStore>,
    pub orders: Arc<dyn OrderStore>,
}

impl Stores {
    /// Use one backend for all three stores.
    pub fn from_backend<S: Storage>(backend: Arc<S>) -> Self {
        Self {
            accounts: backend.clone(),
            requests: backend.clone(),
            orders: backend,
        }
    }
}
