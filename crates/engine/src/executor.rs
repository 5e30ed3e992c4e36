//! Transactional transition executor.
//!
//! Drives one document through one edge of the lifecycle graph using a
//! `DocketStore` backend with snapshot (transaction) semantics. The status
//! change and its history record land in the same snapshot -- either both
//! become durable or neither does.
//!
//! Denied, missing, and stale requests come back as [`TransitionOutcome`]
//! values, not errors. `Err` is reserved for storage faults the caller
//! cannot resolve by changing the request.

use serde::{Deserialize, Serialize};

use docket_core::{authorize, DenialReason, Status, TransitionRequest};
use docket_storage::{DocketStore, NewTransitionRecord, StorageError, TransitionRecord};

use crate::audit::{AuditEvent, AuditSink};

/// Errors surfaced by the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl EngineError {
    /// True when the backend reported itself unavailable, as opposed to
    /// failing one operation.
    pub fn is_unavailable(&self) -> bool {
        match self {
            EngineError::Storage(e) => e.is_unavailable(),
        }
    }
}

/// Outcome of a single transition request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransitionOutcome {
    /// Applied and committed. `record` is the new head of the document's
    /// history.
    Applied { record: TransitionRecord },
    /// Denied by the authorizer. Nothing was written.
    Denied { reason: DenialReason },
    /// The document does not exist.
    NotFound,
    /// The caller's view of the document is stale: either `from_status`
    /// no longer matches, or a concurrent writer won the version race.
    /// `current` is the status the executor read.
    Conflict { current: Status },
}

/// Execute one transition request atomically.
///
/// All storage work happens in a single snapshot:
/// 1. Read the document's standing with a lock
/// 2. Compare the caller's `from_status` against the stored status
/// 3. Authorize the move for the actor's role
/// 4. Compare-and-set the status, stamping the approver when the document
///    enters `approved`
/// 5. Append the history record, then commit
///
/// The audit event is recorded after the commit, best effort. A failing
/// sink never rolls back or fails a transition that already happened.
pub async fn execute<S: DocketStore>(
    storage: &S,
    audit: &dyn AuditSink,
    request: &TransitionRequest,
) -> Result<TransitionOutcome, EngineError> {
    let mut snapshot = storage.begin_snapshot().await?;

    // 1. Read current standing with lock
    let current = match storage
        .get_document_for_update(&mut snapshot, &request.doc)
        .await
    {
        Ok(rec) => rec,
        Err(StorageError::DocumentNotFound { .. }) => {
            let _ = storage.abort_snapshot(snapshot).await;
            return Ok(TransitionOutcome::NotFound);
        }
        Err(e) => {
            let _ = storage.abort_snapshot(snapshot).await;
            return Err(e.into());
        }
    };

    // 2. Caller staleness check -- the caller decided against `from_status`,
    //    so a mismatch means they were looking at an outdated view
    if request.from_status != current.status {
        let _ = storage.abort_snapshot(snapshot).await;
        return Ok(TransitionOutcome::Conflict {
            current: current.status,
        });
    }

    // 3. Authorize against the stored status
    if let Err(reason) = authorize(current.status, request.to_status, request.actor.role) {
        let _ = storage.abort_snapshot(snapshot).await;
        return Ok(TransitionOutcome::Denied { reason });
    }

    // 4. Compare-and-set the status. The approver is written in the same
    //    UPDATE when the document enters `approved`, untouched otherwise
    let approved_by = if request.to_status == Status::Approved {
        Some(request.actor.id.as_str())
    } else {
        None
    };
    let new_version = match storage
        .update_status(
            &mut snapshot,
            &request.doc,
            current.version,
            request.to_status,
            approved_by,
        )
        .await
    {
        Ok(v) => v,
        Err(StorageError::ConflictingState { .. }) => {
            let _ = storage.abort_snapshot(snapshot).await;
            return Ok(TransitionOutcome::Conflict {
                current: current.status,
            });
        }
        Err(e) => {
            let _ = storage.abort_snapshot(snapshot).await;
            return Err(e.into());
        }
    };

    // 5. Append the history record in the same snapshot, then commit
    let record = NewTransitionRecord {
        doc: request.doc.clone(),
        from_status: current.status,
        to_status: request.to_status,
        notes: request.notes.clone(),
        changed_by: request.actor.id.clone(),
        next_step: request.next_step.clone(),
        target_date: request.target_date.clone(),
        from_version: current.version,
        to_version: new_version,
    };
    let record = match storage.append_transition(&mut snapshot, record).await {
        Ok(rec) => rec,
        Err(e) => {
            let _ = storage.abort_snapshot(snapshot).await;
            return Err(e.into());
        }
    };

    storage.commit_snapshot(snapshot).await?;

    // Audit is a side channel: record after the commit and ignore sink
    // failures
    let _ = audit.record(AuditEvent::transition(&record)).await;

    Ok(TransitionOutcome::Applied { record })
}
