//! HTTP middleware: bearer-credential authentication.
//!
//! Authentication runs as a pipeline of stages, each returning either the
//! enriched value or a short-circuit error:
//!
//! 1. [`bearer_credential`] extracts the token from `Authorization: Bearer`.
//! 2. [`verify`] hands it to the configured [`IdentityVerifier`].
//!
//! The resulting [`VerifiedIdentity`] is attached as a request extension and
//! consumed by handlers through the authorization gate.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chefmarket_workflow::{IdentityVerifier, ProviderError, VerifiedIdentity, WorkflowError};
use tracing::{debug, warn};

use super::error::ApiError;
use super::state::AppState;

/// Routes reachable without a credential.
const PUBLIC_PATHS: &[&str] = &["/health"];

pub(crate) async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let identity = match authenticate(state.verifier.as_ref(), request.headers()).await {
        Ok(identity) => identity,
        Err(e) => return ApiError::from(e).into_response(),
    };
    request.extensions_mut().insert(identity);
    next.run(request).await
}

async fn authenticate(
    verifier: &dyn IdentityVerifier,
    headers: &HeaderMap,
) -> Result<VerifiedIdentity, WorkflowError> {
    let credential = bearer_credential(headers)?;
    verify(verifier, credential).await
}

fn bearer_credential(headers: &HeaderMap) -> Result<&str, WorkflowError> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(WorkflowError::Unauthorized)
}

async fn verify(
    verifier: &dyn IdentityVerifier,
    credential: &str,
) -> Result<VerifiedIdentity, WorkflowError> {
    match verifier.verify(credential).await {
        Ok(identity) => {
            debug!(email = %identity.email, provider = verifier.provider_id(), "credential verified");
            Ok(identity)
        }
        Err(ProviderError::Rejected { message, .. }) => {
            warn!(provider = verifier.provider_id(), reason = %message, "credential rejected");
            Err(WorkflowError::Unauthorized)
        }
        Err(e) => Err(WorkflowError::Upstream(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(bearer_credential(&headers_with("Bearer tok-1")).unwrap(), "tok-1");
    }

    #[test]
    fn missing_or_malformed_headers_are_unauthorized() {
        assert!(matches!(
            bearer_credential(&HeaderMap::new()),
            Err(WorkflowError::Unauthorized)
        ));
        assert!(bearer_credential(&headers_with("Basic dXNlcg==")).is_err());
        assert!(bearer_credential(&headers_with("Bearer ")).is_err());
    }
}
