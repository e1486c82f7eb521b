/// Errors raised by a contact store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// An update targeted an id the store does not hold.
    #[error("contact not found: {0}")]
    NotFound(i64),

    /// A stored row could not be turned into a `Contact`.
    #[error("corrupt contact {id}: {reason}")]
    Corrupt { id: i64, reason: String },

    #[error("contact store lock poisoned")]
    LockPoisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;
