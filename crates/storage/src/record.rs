use serde::{Deserialize, Serialize};

use docket_core::{DocumentRef, Status};

/// A document's current standing as stored in the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub doc: DocumentRef,
    pub status: Status,
    /// Monotonic version counter, starts at 0 on creation and increments
    /// by exactly one per applied transition.
    pub version: i64,
    pub created_by: String,
    /// Actor id of the most recent approver. Written atomically with the
    /// status when a document enters `approved`; untouched otherwise.
    pub approved_by: Option<String>,
    /// ISO 8601 / RFC 3339 timestamp string. Assigned by the store at
    /// write time.
    pub updated_at: String,
}

/// One applied transition, as recorded in a document's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Store-assigned id, strictly increasing within a document's history.
    pub id: i64,
    pub doc: DocumentRef,
    pub from_status: Status,
    pub to_status: Status,
    pub notes: String,
    pub changed_by: String,
    pub next_step: Option<String>,
    pub target_date: Option<String>,
    /// ISO 8601 / RFC 3339 timestamp string. Assigned by the store at
    /// write time.
    pub changed_at: String,
    pub from_version: i64,
    pub to_version: i64,
}

/// A transition record as submitted by the executor, before the store
/// assigns its id and timestamp.
///
/// Must be appended in the SAME snapshot (transaction) as the
/// `update_status` call it describes. This is what keeps history lossless:
/// no status change without a history record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransitionRecord {
    pub doc: DocumentRef,
    pub from_status: Status,
    pub to_status: Status,
    pub notes: String,
    pub changed_by: String,
    pub next_step: Option<String>,
    pub target_date: Option<String>,
    pub from_version: i64,
    pub to_version: i64,
}

impl NewTransitionRecord {
    /// Complete this record with the store-assigned id and timestamp.
    pub fn into_record(self, id: i64, changed_at: String) -> TransitionRecord {
        TransitionRecord {
            id,
            doc: self.doc,
            from_status: self.from_status,
            to_status: self.to_status,
            notes: self.notes,
            changed_by: self.changed_by,
            next_step: self.next_step,
            target_date: self.target_date,
            changed_at,
            from_version: self.from_version,
            to_version: self.to_version,
        }
    }
}
