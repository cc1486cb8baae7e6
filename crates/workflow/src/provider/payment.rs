//! Payment intent adapters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{agent_with_timeout, classify_http_error, PaymentProvider, ProviderError};

const HTTP_PROVIDER: &str = "payment";

#[derive(Debug, Deserialize)]
struct IntentResponse {
    client_secret: Option<String>,
}

/// Creates payment intents through a Stripe-compatible REST API.
///
/// `POST {api_url}/v1/payment_intents` with a form body
/// (`amount`, `currency`, `payment_method_types[]=card`) authenticated by the
/// secret key as a bearer token. The response's `client_secret` is returned.
pub struct HttpPaymentProvider {
    api_url: String,
    secret_key: String,
    agent: ureq::Agent,
}

impl HttpPaymentProvider {
    pub fn new(api_url: impl Into<String>, secret_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_url: api_url.into(),
            secret_key: secret_key.into(),
            agent: agent_with_timeout(timeout),
        }
    }

    fn intents_url(&self) -> String {
        format!("{}/v1/payment_intents", self.api_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl PaymentProvider for HttpPaymentProvider {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
    ) -> Result<String, ProviderError> {
        let agent = self.agent.clone();
        let url = self.intents_url();
        let authorization = format!("Bearer {}", self.secret_key);
        let amount = amount_minor.to_string();
        let currency = currency.to_string();

        tokio::task::spawn_blocking(move || {
            let response = agent
                .post(&url)
                .header("Authorization", &authorization)
                .send_form([
                    ("amount", amount.as_str()),
                    ("currency", currency.as_str()),
                    ("payment_method_types[]", "card"),
                ])
                .map_err(|e| classify_http_error(HTTP_PROVIDER, e))?;

            let body: IntentResponse =
                response
                    .into_body()
                    .read_json()
                    .map_err(|e| ProviderError::InvalidResponse {
                        provider: HTTP_PROVIDER.to_string(),
                        message: e.to_string(),
                    })?;

            body.client_secret
                .ok_or_else(|| ProviderError::InvalidResponse {
                    provider: HTTP_PROVIDER.to_string(),
                    message: "missing 'client_secret' field".to_string(),
                })
        })
        .await
        .map_err(|e| ProviderError::RequestFailed {
            provider: HTTP_PROVIDER.to_string(),
            message: format!("task join error: {}", e),
        })?
    }

    fn provider_id(&self) -> &str {
        "http"
    }
}

/// Issues deterministic, fake client secrets. For local development and tests.
#[derive(Debug, Default)]
pub struct StaticPaymentProvider {
    issued: AtomicU64,
}

impl StaticPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentProvider for StaticPaymentProvider {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
    ) -> Result<String, ProviderError> {
        if amount_minor <= 0 {
            return Err(ProviderError::Rejected {
                provider: "static".to_string(),
                message: format!("amount must be positive, got {amount_minor}"),
            });
        }
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("pi_static_{n}_secret_{currency}_{amount_minor}"))
    }

    fn provider_id(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents_url_ignores_trailing_slash() {
        let p = HttpPaymentProvider::new("https://api.example.com/", "sk", Duration::from_secs(1));
        assert_eq!(p.intents_url(), "https://api.example.com/v1/payment_intents");
    }

    #[tokio::test]
    async fn static_provider_issues_distinct_secrets() {
        let p = StaticPaymentProvider::new();
        let first = p.create_intent(2000, "usd").await.unwrap();
        let second = p.create_intent(2000, "usd").await.unwrap();
        assert_eq!(first, "pi_static_1_secret_usd_2000");
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn static_provider_rejects_non_positive_amounts() {
        let p = StaticPaymentProvider::new();
        assert!(matches!(
            p.create_intent(0, "usd").await,
            Err(ProviderError::Rejected { .. })
        ));
    }
}
