use crate::database::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Neither an email nor a phone number was supplied.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The stored graph breaks the primary/secondary rules badly enough that
    /// no identity can be resolved from it.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl IdentityError {
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(%message, "Identity graph invariant violated");
        IdentityError::InvariantViolation(message)
    }
}
