//! Contracts for the external identity and payment providers.
//!
//! The core trusts these collaborators unconditionally:
//! - an [`IdentityVerifier`] turns an opaque bearer credential into a
//!   [`VerifiedIdentity`];
//! - a [`PaymentProvider`] turns an amount and currency into an opaque client
//!   secret for a payment intent. Card details never reach this process.
//!
//! Each contract has an HTTP adapter for production and a static adapter for
//! local development and tests.

pub mod identity;
pub mod payment;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use identity::{HttpIdentityVerifier, StaticIdentityVerifier};
pub use payment::{HttpPaymentProvider, StaticPaymentProvider};

/// An account email the identity provider attests was authenticated for
/// this request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub email: String,
}

impl VerifiedIdentity {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }
}

/// Errors raised by provider adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The provider refused the credential or the request (401/403, unknown
    /// token, unverified email).
    #[error("{provider} rejected the request: {message}")]
    Rejected { provider: String, message: String },

    /// Transport failure or non-success status from the provider.
    #[error("{provider} request failed: {message}")]
    RequestFailed { provider: String, message: String },

    /// The provider answered, but not with the expected payload.
    #[error("{provider} returned an invalid response: {message}")]
    InvalidResponse { provider: String, message: String },
}

/// Verifies an opaque, caller-supplied credential.
#[async_trait]
pub trait IdentityVerifier: Send + Sync + 'static {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, ProviderError>;

    /// Identifier for logging (e.g. `"http"`, `"static"`).
    fn provider_id(&self) -> &str;
}

/// Creates payment intents.
#[async_trait]
pub trait PaymentProvider: Send + Sync + 'static {
    /// `amount_minor` is in the currency's minor unit (cents for `usd`).
    /// Returns the client secret for the created intent.
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
    ) -> Result<String, ProviderError>;

    /// Identifier for logging (e.g. `"http"`, `"static"`).
    fn provider_id(&self) -> &str;
}

/// Build a `ureq` agent with a global request timeout.
pub(crate) fn agent_with_timeout(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// Map a `ureq` transport/status error to a [`ProviderError`]. 401 and 403
/// become `Rejected`; everything else is `RequestFailed`.
pub(crate) fn classify_http_error(provider: &str, err: ureq::Error) -> ProviderError {
    match err {
        ureq::Error::StatusCode(status @ (401 | 403)) => ProviderError::Rejected {
            provider: provider.to_string(),
            message: format!("status {status}"),
        },
        ureq::Error::StatusCode(status) => ProviderError::RequestFailed {
            provider: provider.to_string(),
            message: format!("status {status}"),
        },
        other => ProviderError::RequestFailed {
            provider: provider.to_string(),
            message: other.to_string(),
        },
    }
}
