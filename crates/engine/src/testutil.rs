//! Fault-injecting test doubles shared by the engine test suites.

use async_trait::async_trait;

use docket_core::{DocumentKind, DocumentRef, Status};
use docket_storage::{
    DocketStore, DocumentRecord, MemorySnapshot, MemoryStore, NewTransitionRecord, StorageError,
    TransitionRecord,
};

use crate::audit::{AuditError, AuditEvent, AuditSink};

enum Fault {
    /// `append_transition` fails with `Backend` for the target document.
    AppendBackend,
    /// `get_document_for_update` fails with `Unavailable` for the target
    /// document.
    ReadUnavailable,
}

/// A `MemoryStore` wrapper that injects one storage fault for one target
/// document and delegates everything else.
pub struct FaultStore {
    inner: MemoryStore,
    target: DocumentRef,
    fault: Fault,
}

impl FaultStore {
    pub fn failing_append(target: DocumentRef) -> Self {
        FaultStore {
            inner: MemoryStore::new(),
            target,
            fault: Fault::AppendBackend,
        }
    }

    pub fn unavailable_on_read(target: DocumentRef) -> Self {
        FaultStore {
            inner: MemoryStore::new(),
            target,
            fault: Fault::ReadUnavailable,
        }
    }
}

#[async_trait]
impl DocketStore for FaultStore {
    type Snapshot = MemorySnapshot;

    async fn begin_snapshot(&self) -> Result<MemorySnapshot, StorageError> {
        self.inner.begin_snapshot().await
    }

    async fn commit_snapshot(&self, snapshot: MemorySnapshot) -> Result<(), StorageError> {
        self.inner.commit_snapshot(snapshot).await
    }

    async fn abort_snapshot(&self, snapshot: MemorySnapshot) -> Result<(), StorageError> {
        self.inner.abort_snapshot(snapshot).await
    }

    async fn create_document(
        &self,
        snapshot: &mut MemorySnapshot,
        doc: &DocumentRef,
        created_by: &str,
    ) -> Result<(), StorageError> {
        self.inner.create_document(snapshot, doc, created_by).await
    }

    async fn get_document_for_update(
        &self,
        snapshot: &mut MemorySnapshot,
        doc: &DocumentRef,
    ) -> Result<DocumentRecord, StorageError> {
        if matches!(self.fault, Fault::ReadUnavailable) && doc == &self.target {
            return Err(StorageError::Unavailable("injected outage".to_string()));
        }
        self.inner.get_document_for_update(snapshot, doc).await
    }

    async fn update_status(
        &self,
        snapshot: &mut MemorySnapshot,
        doc: &DocumentRef,
        expected_version: i64,
        new_status: Status,
        approved_by: Option<&str>,
    ) -> Result<i64, StorageError> {
        self.inner
            .update_status(snapshot, doc, expected_version, new_status, approved_by)
            .await
    }

    async fn append_transition(
        &self,
        snapshot: &mut MemorySnapshot,
        record: NewTransitionRecord,
    ) -> Result<TransitionRecord, StorageError> {
        if matches!(self.fault, Fault::AppendBackend) && record.doc == self.target {
            return Err(StorageError::Backend("injected append failure".to_string()));
        }
        self.inner.append_transition(snapshot, record).await
    }

    async fn get_document(&self, doc: &DocumentRef) -> Result<DocumentRecord, StorageError> {
        self.inner.get_document(doc).await
    }

    async fn list_documents(
        &self,
        kind: Option<DocumentKind>,
        status: Option<Status>,
    ) -> Result<Vec<DocumentRecord>, StorageError> {
        self.inner.list_documents(kind, status).await
    }

    async fn history(&self, doc: &DocumentRef) -> Result<Vec<TransitionRecord>, StorageError> {
        self.inner.history(doc).await
    }
}

/// An audit sink that always fails.
pub struct FailingAuditSink;

#[async_trait]
impl AuditSink for FailingAuditSink {
    async fn record(&self, _event: AuditEvent) -> Result<(), AuditError> {
        Err(AuditError::Sink("injected sink failure".to_string()))
    }
}
