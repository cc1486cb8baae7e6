/// All errors that can be returned by a chefmarket store implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No account is keyed by the given email.
    #[error("account not found: {email}")]
    AccountNotFound { email: String },

    /// No elevation request with the given id.
    #[error("elevation request not found: {request_id}")]
    RequestNotFound { request_id: String },

    /// No order with the given id.
    #[error("order not found: {order_id}")]
    OrderNotFound { order_id: String },

    /// A record with this key already exists (insert-only operations).
    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },

    /// The write would leave an account both admin and fraud-marked.
    #[error("account {email}: {reason}")]
    Conflict { email: String, reason: &'static str },

    /// A backend-specific storage error (connection, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// True for the three "referenced record is absent" variants.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::AccountNotFound { .. }
                | StorageError::RequestNotFound { .. }
                | StorageError::OrderNotFound { .. }
        )
    }
}
