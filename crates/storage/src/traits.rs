use async_trait::async_trait;

use docket_core::{DocumentKind, DocumentRef, Status};

use crate::error::StorageError;
use crate::record::{DocumentRecord, NewTransitionRecord, TransitionRecord};

/// Contract every docket storage backend implements.
///
/// A `DocketStore` keeps two things durable: each document's standing (its
/// current status plus an optimistic-concurrency version) and the
/// append-only history of applied transitions.
///
/// Writes happen inside a snapshot, the backend's transaction handle:
/// `begin_snapshot` opens one, the mutating methods take it by `&mut`, and
/// `commit_snapshot` or `abort_snapshot` consumes it. A snapshot that is
/// dropped without being committed rolls back.
///
/// Two invariants every backend carries:
///
/// - `update_status` is a compare-and-set. The write lands only if the
///   stored version still equals `expected_version`; otherwise the call
///   fails with `ConflictingState` and nothing changes.
/// - a status change and the `append_transition` describing it share one
///   snapshot, so they become durable together or not at all.
///
/// The `Send + Sync + 'static` bound lets a store live in shared server
/// state and cross task boundaries.
#[async_trait]
pub trait DocketStore: Send + Sync + 'static {
    /// Backend-specific transaction handle. `Send` so open transactions
    /// can move between tasks.
    type Snapshot: Send;

    // ── Transaction lifecycle ─────────────────────────────────────────────────

    /// Open a transaction.
    async fn begin_snapshot(&self) -> Result<Self::Snapshot, StorageError>;

    /// Make every write staged in `snapshot` durable.
    async fn commit_snapshot(&self, snapshot: Self::Snapshot) -> Result<(), StorageError>;

    /// Discard every write staged in `snapshot`.
    async fn abort_snapshot(&self, snapshot: Self::Snapshot) -> Result<(), StorageError>;

    // ── Document writes (inside a snapshot) ───────────────────────────────────

    /// Register a document at status `draft`, version 0.
    ///
    /// Fails with `AlreadyExists` when the (kind, id) pair is taken, no
    /// matter how far that document has moved since.
    async fn create_document(
        &self,
        snapshot: &mut Self::Snapshot,
        doc: &DocumentRef,
        created_by: &str,
    ) -> Result<(), StorageError>;

    /// Read a document's standing and hold it against concurrent writers
    /// for the rest of the snapshot (row-lock semantics, as in
    /// `SELECT ... FOR UPDATE`).
    ///
    /// Fails with `DocumentNotFound` for an unknown document.
    async fn get_document_for_update(
        &self,
        snapshot: &mut Self::Snapshot,
        doc: &DocumentRef,
    ) -> Result<DocumentRecord, StorageError>;

    /// Move a document to `new_status`, conditional on its version.
    ///
    /// The write applies only while the stored version equals
    /// `expected_version`; a stale version fails with `ConflictingState`
    /// and leaves the row untouched. On success the version increments and
    /// the new value is returned.
    ///
    /// `approved_by` is written in the same conditional write when `Some`
    /// and left as stored when `None`. Callers pass `Some` exactly when
    /// `new_status` is `approved`.
    async fn update_status(
        &self,
        snapshot: &mut Self::Snapshot,
        doc: &DocumentRef,
        expected_version: i64,
        new_status: Status,
        approved_by: Option<&str>,
    ) -> Result<i64, StorageError>;

    // ── History writes (inside a snapshot) ────────────────────────────────────

    /// Stage one history record.
    ///
    /// The record must join the snapshot of the `update_status` it
    /// describes; a status change may never outlive a lost history record
    /// or vice versa. The store assigns `id` and `changed_at` and returns
    /// the completed record.
    async fn append_transition(
        &self,
        snapshot: &mut Self::Snapshot,
        record: NewTransitionRecord,
    ) -> Result<TransitionRecord, StorageError>;

    // ── Reads (no snapshot) ───────────────────────────────────────────────────

    /// Read a document's standing without locking anything.
    ///
    /// Fails with `DocumentNotFound` for an unknown document.
    async fn get_document(&self, doc: &DocumentRef) -> Result<DocumentRecord, StorageError>;

    /// All documents, narrowed by kind and/or status when the filters are
    /// `Some`.
    async fn list_documents(
        &self,
        kind: Option<DocumentKind>,
        status: Option<Status>,
    ) -> Result<Vec<DocumentRecord>, StorageError>;

    /// A document's applied transitions, most recent first. Unknown
    /// documents yield an empty list, not an error.
    async fn history(&self, doc: &DocumentRef) -> Result<Vec<TransitionRecord>, StorageError>;
}
