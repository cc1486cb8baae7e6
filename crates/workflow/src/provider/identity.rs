//! Identity verification adapters.
//!
//! The HTTP adapter uses `ureq` (sync) wrapped in
//! `tokio::task::spawn_blocking` so verification never blocks the runtime.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{agent_with_timeout, classify_http_error, IdentityVerifier, ProviderError, VerifiedIdentity};

const HTTP_PROVIDER: &str = "identity";

/// Payload expected from the verification endpoint.
#[derive(Debug, Deserialize)]
struct VerifyResponse {
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
}

/// Verifies bearer credentials against a remote endpoint.
///
/// Sends `GET {verify_url}` with `Authorization: Bearer <credential>` and
/// expects a JSON body carrying at least `email`. A body with
/// `"email_verified": false` is treated as a rejection.
pub struct HttpIdentityVerifier {
    verify_url: String,
    agent: ureq::Agent,
}

impl HttpIdentityVerifier {
    pub fn new(verify_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            verify_url: verify_url.into(),
            agent: agent_with_timeout(timeout),
        }
    }
}

fn identity_from_response(body: VerifyResponse) -> Result<VerifiedIdentity, ProviderError> {
    if body.email_verified == Some(false) {
        return Err(ProviderError::Rejected {
            provider: HTTP_PROVIDER.to_string(),
            message: "email not verified".to_string(),
        });
    }
    match body.email {
        Some(email) if !email.trim().is_empty() => Ok(VerifiedIdentity::new(email)),
        _ => Err(ProviderError::InvalidResponse {
            provider: HTTP_PROVIDER.to_string(),
            message: "missing 'email' field".to_string(),
        }),
    }
}

#[async_trait]
impl IdentityVerifier for HttpIdentityVerifier {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, ProviderError> {
        let agent = self.agent.clone();
        let url = self.verify_url.clone();
        let authorization = format!("Bearer {}", credential);

        tokio::task::spawn_blocking(move || {
            let response = agent
                .get(&url)
                .header("Authorization", &authorization)
                .call()
                .map_err(|e| classify_http_error(HTTP_PROVIDER, e))?;

            let body: VerifyResponse =
                response
                    .into_body()
                    .read_json()
                    .map_err(|e| ProviderError::InvalidResponse {
                        provider: HTTP_PROVIDER.to_string(),
                        message: e.to_string(),
                    })?;

            identity_from_response(body)
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

/// Fixed token → email table for local development and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityVerifier {
    tokens: HashMap<String, String>,
}

impl StaticIdentityVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    pub fn with_token(mut self, token: impl Into<String>, email: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), email.into());
        self
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, ProviderError> {
        self.tokens
            .get(credential)
            .map(VerifiedIdentity::new)
            .ok_or_else(|| ProviderError::Rejected {
                provider: "static".to_string(),
                message: "unknown token".to_string(),
            })
    }

    fn provider_id(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_verifier_resolves_known_tokens() {
        let verifier = StaticIdentityVerifier::new()
            .with_token("tok-a", "a@x.com")
            .with_token("tok-b", "b@x.com");
        assert_eq!(
            verifier.verify("tok-b").await.unwrap(),
            VerifiedIdentity::new("b@x.com")
        );
    }

    #[tokio::test]
    async fn static_verifier_rejects_unknown_tokens() {
        let verifier = StaticIdentityVerifier::new().with_token("tok-a", "a@x.com");
        assert!(matches!(
            verifier.verify("forged").await,
            Err(ProviderError::Rejected { .. })
        ));
    }

    #[test]
    fn response_without_email_is_invalid() {
        let body = VerifyResponse {
            email: None,
            email_verified: Some(true),
        };
        assert!(matches!(
            identity_from_response(body),
            Err(ProviderError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn unverified_email_is_rejected() {
        let body = VerifyResponse {
            email: Some("a@x.com".to_string()),
            email_verified: Some(false),
        };
        assert!(matches!(
            identity_from_response(body),
            Err(ProviderError::Rejected { .. })
        ));
    }

    #[test]
    fn verified_response_yields_identity() {
        let body: VerifyResponse =
            serde_json::from_str(r#"{"email":"a@x.com","email_verified":true,"uid":"u1"}"#)
                .unwrap();
        assert_eq!(
            identity_from_response(body).unwrap(),
            VerifiedIdentity::new("a@x.com")
        );
    }
}
