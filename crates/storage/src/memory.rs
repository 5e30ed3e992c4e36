//! In-memory reference backend.
//!
//! `MemoryStore` backs the bundled server and the test suites. Writes are
//! staged inside the snapshot and only reach the shared tables on commit,
//! so uncommitted work is invisible to readers and an abort is a no-op on
//! shared state. The first staged write to a document takes a
//! per-document reservation; a second open snapshot writing the same
//! document fails its compare-and-set immediately instead of waiting to
//! collide at commit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use async_trait::async_trait;

use docket_core::{DocumentKind, DocumentRef, Status};

use crate::error::StorageError;
use crate::record::{DocumentRecord, NewTransitionRecord, TransitionRecord};
use crate::traits::DocketStore;

#[derive(Debug, Default)]
struct Inner {
    documents: HashMap<DocumentRef, DocumentRecord>,
    transitions: Vec<TransitionRecord>,
    next_record_id: i64,
    next_snapshot_id: u64,
    /// Documents with a staged write in some open snapshot, keyed to the
    /// snapshot that holds them. Cleared on commit, abort, or drop.
    write_locks: HashMap<DocumentRef, u64>,
}

/// Thread-safe in-memory [`DocketStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

/// An open transaction against a [`MemoryStore`].
#[derive(Debug)]
pub struct MemorySnapshot {
    id: u64,
    staged_docs: HashMap<DocumentRef, DocumentRecord>,
    staged_transitions: Vec<TransitionRecord>,
    finished: bool,
    store: Weak<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

// The mutex is only held for short synchronous sections, never across an
// await. Recover the guard if a panic elsewhere poisoned it; the tables
// are still structurally valid.
fn locked(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|e| e.into_inner())
}

fn release_locks(inner: &mut Inner, snapshot_id: u64) {
    inner.write_locks.retain(|_, holder| *holder != snapshot_id);
}

fn now_iso8601() -> String {
    let now = time::OffsetDateTime::now_utc();
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        now.year(),
        now.month() as u8,
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

#[async_trait]
impl DocketStore for MemoryStore {
    type Snapshot = MemorySnapshot;

    async fn begin_snapshot(&self) -> Result<Self::Snapshot, StorageError> {
        let mut inner = locked(&self.inner);
        let id = inner.next_snapshot_id;
        inner.next_snapshot_id += 1;
        Ok(MemorySnapshot {
            id,
            staged_docs: HashMap::new(),
            staged_transitions: Vec::new(),
            finished: false,
            store: Arc::downgrade(&self.inner),
        })
    }

    async fn commit_snapshot(&self, mut snapshot: Self::Snapshot) -> Result<(), StorageError> {
        let mut inner = locked(&self.inner);
        snapshot.finished = true;
        for (doc, record) in snapshot.staged_docs.drain() {
            inner.documents.insert(doc, record);
        }
        inner.transitions.append(&mut snapshot.staged_transitions);
        release_locks(&mut inner, snapshot.id);
        Ok(())
    }

    async fn abort_snapshot(&self, mut snapshot: Self::Snapshot) -> Result<(), StorageError> {
        let mut inner = locked(&self.inner);
        snapshot.finished = true;
        snapshot.staged_docs.clear();
        snapshot.staged_transitions.clear();
        release_locks(&mut inner, snapshot.id);
        Ok(())
    }

    async fn create_document(
        &self,
        snapshot: &mut Self::Snapshot,
        doc: &DocumentRef,
        created_by: &str,
    ) -> Result<(), StorageError> {
        let mut inner = locked(&self.inner);
        let reserved_elsewhere = inner
            .write_locks
            .get(doc)
            .is_some_and(|holder| *holder != snapshot.id);
        if snapshot.staged_docs.contains_key(doc)
            || inner.documents.contains_key(doc)
            || reserved_elsewhere
        {
            return Err(StorageError::AlreadyExists { doc: doc.clone() });
        }
        let record = DocumentRecord {
            doc: doc.clone(),
            status: Status::Draft,
            version: 0,
            created_by: created_by.to_string(),
            approved_by: None,
            updated_at: now_iso8601(),
        };
        inner.write_locks.insert(doc.clone(), snapshot.id);
        snapshot.staged_docs.insert(doc.clone(), record);
        Ok(())
    }

    async fn get_document_for_update(
        &self,
        snapshot: &mut Self::Snapshot,
        doc: &DocumentRef,
    ) -> Result<DocumentRecord, StorageError> {
        let inner = locked(&self.inner);
        if let Some(staged) = snapshot.staged_docs.get(doc) {
            return Ok(staged.clone());
        }
        inner
            .documents
            .get(doc)
            .cloned()
            .ok_or_else(|| StorageError::DocumentNotFound { doc: doc.clone() })
    }

    async fn update_status(
        &self,
        snapshot: &mut Self::Snapshot,
        doc: &DocumentRef,
        expected_version: i64,
        new_status: Status,
        approved_by: Option<&str>,
    ) -> Result<i64, StorageError> {
        let mut inner = locked(&self.inner);
        // Visibility first: a document staged only in some other open
        // snapshot does not exist yet as far as this one can tell.
        let current = match snapshot.staged_docs.get(doc) {
            Some(staged) => staged.clone(),
            None => inner
                .documents
                .get(doc)
                .cloned()
                .ok_or_else(|| StorageError::DocumentNotFound { doc: doc.clone() })?,
        };
        let reserved_elsewhere = inner
            .write_locks
            .get(doc)
            .is_some_and(|holder| *holder != snapshot.id);
        if reserved_elsewhere || current.version != expected_version {
            return Err(StorageError::ConflictingState {
                doc: doc.clone(),
                expected_version,
            });
        }
        let new_version = expected_version + 1;
        let mut updated = current;
        updated.status = new_status;
        updated.version = new_version;
        if let Some(approver) = approved_by {
            updated.approved_by = Some(approver.to_string());
        }
        updated.updated_at = now_iso8601();
        inner.write_locks.insert(doc.clone(), snapshot.id);
        snapshot.staged_docs.insert(doc.clone(), updated);
        Ok(new_version)
    }

    async fn append_transition(
        &self,
        snapshot: &mut Self::Snapshot,
        record: NewTransitionRecord,
    ) -> Result<TransitionRecord, StorageError> {
        let mut inner = locked(&self.inner);
        inner.next_record_id += 1;
        let completed = record.into_record(inner.next_record_id, now_iso8601());
        snapshot.staged_transitions.push(completed.clone());
        Ok(completed)
    }

    async fn get_document(&self, doc: &DocumentRef) -> Result<DocumentRecord, StorageError> {
        let inner = locked(&self.inner);
        inner
            .documents
            .get(doc)
            .cloned()
            .ok_or_else(|| StorageError::DocumentNotFound { doc: doc.clone() })
    }

    async fn list_documents(
        &self,
        kind: Option<DocumentKind>,
        status: Option<Status>,
    ) -> Result<Vec<DocumentRecord>, StorageError> {
        let inner = locked(&self.inner);
        let mut records: Vec<DocumentRecord> = inner
            .documents
            .values()
            .filter(|record| kind.map_or(true, |k| record.doc.kind == k))
            .filter(|record| status.map_or(true, |s| record.status == s))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            (a.doc.kind.as_str(), &a.doc.id).cmp(&(b.doc.kind.as_str(), &b.doc.id))
        });
        Ok(records)
    }

    async fn history(&self, doc: &DocumentRef) -> Result<Vec<TransitionRecord>, StorageError> {
        let inner = locked(&self.inner);
        Ok(inner
            .transitions
            .iter()
            .rev()
            .filter(|record| &record.doc == doc)
            .cloned()
            .collect())
    }
}

impl Drop for MemorySnapshot {
    fn drop(&mut self) {
        // A snapshot dropped without commit or abort rolls back: staged
        // writes die with the struct, only the reservations need undoing.
        if self.finished {
            return;
        }
        if let Some(inner) = self.store.upgrade() {
            release_locks(&mut locked(&inner), self.id);
        }
    }
}
