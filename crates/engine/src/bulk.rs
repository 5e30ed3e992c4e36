//! Best-effort bulk transition executor.
//!
//! Each document in the batch is its own unit of work with its own
//! snapshot: a skip or failure on one document never rolls back another.
//! Partial completion is the normal shape of the result, reported as
//! `applied < requested` with every skip enumerated, never as an error.
//!
//! The one exception is an unavailable backend. Once the store reports
//! `Unavailable` there is no point hammering the remaining refs, so the
//! batch stops with an error. Items committed before the outage stay
//! committed.

use docket_core::{
    authorize, Actor, BulkItemOutcome, BulkItemReport, BulkTransitionRequest,
    BulkTransitionResult, DocumentRef, Status,
};
use docket_storage::{DocketStore, NewTransitionRecord, StorageError};

use crate::audit::{AuditEvent, AuditSink};
use crate::executor::EngineError;

/// Execute a bulk transition request, one snapshot per document.
///
/// Bulk requests carry no `from_status`: each document gets a fresh
/// locking read and is authorized against whatever status it is actually
/// in. One audit event summarizes the whole batch.
pub async fn execute_bulk<S: DocketStore>(
    storage: &S,
    audit: &dyn AuditSink,
    request: &BulkTransitionRequest,
) -> Result<BulkTransitionResult, EngineError> {
    // Empty batch -> nothing to do
    if request.refs.is_empty() {
        return Ok(BulkTransitionResult {
            requested: 0,
            applied: 0,
            items: Vec::new(),
        });
    }

    let mut applied = 0;
    let mut items = Vec::with_capacity(request.refs.len());

    for doc in &request.refs {
        let outcome = match execute_item(
            storage,
            doc,
            request.to_status,
            &request.actor,
            &request.notes,
        )
        .await
        {
            Ok(outcome) => outcome,
            // An unavailable backend stops the batch; already-committed
            // items are not rolled back
            Err(e) if e.is_unavailable() => return Err(e.into()),
            // Any other storage fault is scoped to this document
            Err(e) => BulkItemOutcome::Failed {
                error: e.to_string(),
            },
        };
        if matches!(outcome, BulkItemOutcome::Applied { .. }) {
            applied += 1;
        }
        items.push(BulkItemReport {
            doc: doc.clone(),
            outcome,
        });
    }

    let result = BulkTransitionResult {
        requested: request.refs.len(),
        applied,
        items,
    };

    let _ = audit
        .record(AuditEvent::bulk_transition(
            &request.actor.id,
            request.to_status,
            &result,
        ))
        .await;

    Ok(result)
}

/// One document's unit of work: locking read, authorize against the
/// stored status, compare-and-set plus history append, commit.
///
/// `Ok` carries the per-item outcome, skips included. `Err` carries
/// storage faults for the caller to classify.
async fn execute_item<S: DocketStore>(
    storage: &S,
    doc: &DocumentRef,
    to_status: Status,
    actor: &Actor,
    notes: &str,
) -> Result<BulkItemOutcome, StorageError> {
    let mut snapshot = storage.begin_snapshot().await?;

    let current = match storage.get_document_for_update(&mut snapshot, doc).await {
        Ok(rec) => rec,
        Err(StorageError::DocumentNotFound { .. }) => {
            let _ = storage.abort_snapshot(snapshot).await;
            return Ok(BulkItemOutcome::SkippedNotFound);
        }
        Err(e) => {
            let _ = storage.abort_snapshot(snapshot).await;
            return Err(e);
        }
    };

    if let Err(reason) = authorize(current.status, to_status, actor.role) {
        let _ = storage.abort_snapshot(snapshot).await;
        return Ok(BulkItemOutcome::SkippedInvalidTransition { reason });
    }

    let approved_by = if to_status == Status::Approved {
        Some(actor.id.as_str())
    } else {
        None
    };
    let new_version = match storage
        .update_status(&mut snapshot, doc, current.version, to_status, approved_by)
        .await
    {
        Ok(v) => v,
        Err(StorageError::ConflictingState { .. }) => {
            let _ = storage.abort_snapshot(snapshot).await;
            return Ok(BulkItemOutcome::SkippedConflict);
        }
        Err(e) => {
            let _ = storage.abort_snapshot(snapshot).await;
            return Err(e);
        }
    };

    let record = NewTransitionRecord {
        doc: doc.clone(),
        from_status: current.status,
        to_status,
        notes: notes.to_string(),
        changed_by: actor.id.clone(),
        next_step: None,
        target_date: None,
        from_version: current.version,
        to_version: new_version,
    };
    let record = match storage.append_transition(&mut snapshot, record).await {
        Ok(rec) => rec,
        Err(e) => {
            let _ = storage.abort_snapshot(snapshot).await;
            return Err(e);
        }
    };

    storage.commit_snapshot(snapshot).await?;

    Ok(BulkItemOutcome::Applied {
        record_id: record.id,
    })
}
