//! Application state and provider construction.

use std::sync::Arc;

use chefmarket_storage::MemoryStorage;
use chefmarket_workflow::provider::{
    HttpIdentityVerifier, HttpPaymentProvider, StaticIdentityVerifier, StaticPaymentProvider,
};
use chefmarket_workflow::{
    AuthorizationGate, IdentityVerifier, PaymentProvider, Stores, WorkflowCoordinator,
};

use crate::config::{IdentitySettings, PaymentSettings, ProviderMode, Settings};

/// Application state shared across request handlers.
pub(crate) struct AppState {
    pub(crate) gate: AuthorizationGate,
    pub(crate) coordinator: WorkflowCoordinator,
    /// Stage two of the authentication pipeline.
    pub(crate) verifier: Arc<dyn IdentityVerifier>,
}

impl AppState {
    pub(crate) fn new(
        stores: Stores,
        verifier: Arc<dyn IdentityVerifier>,
        payments: Arc<dyn PaymentProvider>,
        currency: &str,
    ) -> Self {
        Self {
            gate: AuthorizationGate::new(stores.accounts.clone()),
            coordinator: WorkflowCoordinator::new(stores, payments, currency),
            verifier,
        }
    }

    /// In-memory stores with the providers named in `settings`.
    pub(crate) fn from_settings(settings: &Settings) -> Self {
        let stores = Stores::from_backend(Arc::new(MemoryStorage::new()));
        Self::new(
            stores,
            identity_verifier(&settings.identity),
            payment_provider(&settings.payment),
            &settings.payment.currency,
        )
    }
}

fn identity_verifier(settings: &IdentitySettings) -> Arc<dyn IdentityVerifier> {
    match (settings.mode, &settings.verify_url) {
        (ProviderMode::Http, Some(url)) => {
            Arc::new(HttpIdentityVerifier::new(url.clone(), settings.timeout()))
        }
        _ => Arc::new(StaticIdentityVerifier::from_map(
            settings.tokens.clone().into_iter().collect(),
        )),
    }
}

fn payment_provider(settings: &PaymentSettings) -> Arc<dyn PaymentProvider> {
    match (settings.mode, &settings.secret_key) {
        (ProviderMode::Http, Some(key)) => Arc::new(HttpPaymentProvider::new(
            settings.api_url.clone(),
            key.clone(),
            settings.timeout(),
        )),
        _ => Arc::new(StaticPaymentProvider::new()),
    }
}
