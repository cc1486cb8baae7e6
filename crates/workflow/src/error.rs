use chefmarket_storage::{ParseStatusError, StorageError};

use crate::provider::ProviderError;

/// Errors surfaced by the authorization gate and the workflow coordinator.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// No verified identity accompanied the request.
    #[error("authentication required")]
    Unauthorized,

    /// The caller's identity failed a capability or ownership check.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A referenced account, elevation request or order does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The requested transition is never allowed (e.g. marking an admin as fraud).
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// A boundary value failed validation (unknown enum value, bad amount, ...).
    #[error("invalid input: {0}")]
    Validation(String),

    /// The identity or payment provider failed.
    #[error("upstream provider error: {0}")]
    Upstream(#[from] ProviderError),

    /// A store read or write failed.
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for WorkflowError {
    fn from(err: StorageError) -> Self {
        if err.is_not_found() {
            WorkflowError::NotFound(err.to_string())
        } else if matches!(err, StorageError::Conflict { .. }) {
            WorkflowError::InvalidTransition(err.to_string())
        } else {
            WorkflowError::Storage(err)
        }
    }
}

impl From<ParseStatusError> for WorkflowError {
    fn from(err: ParseStatusError) -> Self {
        WorkflowError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_storage_errors_become_not_found() {
        let err: WorkflowError = StorageError::OrderNotFound {
            order_id: "o-1".to_string(),
        }
        .into();
        assert!(matches!(err, WorkflowError::NotFound(ref m) if m == "order not found: o-1"));
    }

    #[test]
    fn backend_errors_stay_storage_errors() {
        let err: WorkflowError = StorageError::Backend("disk full".to_string()).into();
        assert!(matches!(err, WorkflowError::Storage(_)));
        assert_eq!(err.to_string(), "storage backend error: disk full");
    }

    #[test]
    fn conflicting_account_writes_become_invalid_transitions() {
        let err: WorkflowError = StorageError::Conflict {
            email: "u@x.com".to_string(),
            reason: "admin accounts cannot be marked as fraud",
        }
        .into();
        assert!(matches!(err, WorkflowError::InvalidTransition(_)));
        assert_eq!(
            err.to_string(),
            "invalid transition: account u@x.com: admin accounts cannot be marked as fraud"
        );
    }

    #[test]
    fn parse_errors_become_validation_errors() {
        let err: WorkflowError = "teleported"
            .parse::<chefmarket_storage::OrderStatus>()
            .unwrap_err()
            .into();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }
}
