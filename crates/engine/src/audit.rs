//! Audit trail.
//!
//! Audit events are advisory. The executor records them after its snapshot
//! commits, outside the transaction, and ignores sink failures: a broken
//! audit pipeline must never roll back or fail a transition that already
//! happened. The transition history in storage, not the audit trail, is
//! the durable record.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use docket_core::{BulkTransitionResult, DocumentRef, Status};
use docket_storage::TransitionRecord;

/// What kind of action an audit event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Transition,
    BulkTransition,
    CreateDocument,
}

/// One advisory audit event.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub actor_id: String,
    pub action: AuditAction,
    pub description: String,
    pub metadata: serde_json::Value,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub recorded_at: String,
}

impl AuditEvent {
    /// Event for one applied transition.
    pub fn transition(record: &TransitionRecord) -> Self {
        AuditEvent {
            actor_id: record.changed_by.clone(),
            action: AuditAction::Transition,
            description: format!(
                "moved {} from {} to {}",
                record.doc, record.from_status, record.to_status
            ),
            metadata: serde_json::json!({
                "doc": record.doc,
                "from_status": record.from_status,
                "to_status": record.to_status,
                "record_id": record.id,
            }),
            recorded_at: now_iso8601(),
        }
    }

    /// Summary event for one bulk run, applied and skipped items alike.
    pub fn bulk_transition(actor_id: &str, to_status: Status, result: &BulkTransitionResult) -> Self {
        AuditEvent {
            actor_id: actor_id.to_string(),
            action: AuditAction::BulkTransition,
            description: format!(
                "bulk move to {}: {} of {} applied",
                to_status, result.applied, result.requested
            ),
            metadata: serde_json::json!({
                "to_status": to_status,
                "requested": result.requested,
                "applied": result.applied,
            }),
            recorded_at: now_iso8601(),
        }
    }

    /// Event for one document created.
    pub fn create_document(actor_id: &str, doc: &DocumentRef) -> Self {
        AuditEvent {
            actor_id: actor_id.to_string(),
            action: AuditAction::CreateDocument,
            description: format!("created {doc}"),
            metadata: serde_json::json!({ "doc": doc }),
            recorded_at: now_iso8601(),
        }
    }
}

/// Errors an audit sink may report. Callers are expected to log and move
/// on, never to propagate.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit sink error: {0}")]
    Sink(String),
}

/// Destination for audit events.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError>;
}

/// In-memory audit sink backing the bundled server and the test suites.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        MemoryAuditSink::default()
    }

    /// All events recorded so far, oldest first.
    pub fn events(&self) -> Vec<AuditEvent> {
        // Recover events even if the mutex was poisoned by a panic elsewhere
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).push(event);
        Ok(())
    }
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
