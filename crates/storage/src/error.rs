use docket_core::DocumentRef;

/// All errors that can be returned by a DocketStore implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Optimistic concurrency check failed -- another transaction modified
    /// the document concurrently. The expected version was not found.
    #[error("conflicting state on document {doc}: expected version {expected_version}")]
    ConflictingState {
        doc: DocumentRef,
        expected_version: i64,
    },

    /// Document not found -- no record with the given (kind, id).
    #[error("document not found: {doc}")]
    DocumentNotFound { doc: DocumentRef },

    /// Document already exists -- a record with this (kind, id) was created
    /// earlier.
    #[error("document already exists: {doc}")]
    AlreadyExists { doc: DocumentRef },

    /// A backend-specific storage error (serialization, constraint, etc.).
    /// Scoped to the operation that raised it; other documents are fine.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// The backend itself is unreachable (connection refused, pool
    /// exhausted). Unlike [`StorageError::Backend`] this poisons the whole
    /// run: bulk execution stops rather than burning the remaining items
    /// against a dead store.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Whether this error indicates the store as a whole is down.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StorageError::Unavailable(_))
    }
}
