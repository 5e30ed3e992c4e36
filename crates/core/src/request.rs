//! Wire-level request and result shapes shared by the engine, the HTTP
//! surface, and the CLI.

use serde::{Deserialize, Serialize};

use crate::authorize::DenialReason;
use crate::document::DocumentRef;
use crate::role::Actor;
use crate::status::Status;

/// A request to move one document along one edge of the lifecycle graph.
///
/// `from_status` is the status the caller believes the document is in. The
/// executor compares it against the stored status before doing anything
/// else; a mismatch means the caller is acting on stale information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub doc: DocumentRef,
    pub from_status: Status,
    pub to_status: Status,
    pub actor: Actor,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub next_step: Option<String>,
    #[serde(default)]
    pub target_date: Option<String>,
}

/// A request to move several documents to the same destination status.
///
/// Bulk requests carry no `from_status`: each document is read fresh and
/// authorized against whatever status it is actually in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkTransitionRequest {
    pub refs: Vec<DocumentRef>,
    pub to_status: Status,
    pub actor: Actor,
    #[serde(default)]
    pub notes: String,
}

/// Outcome of one document within a bulk request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BulkItemOutcome {
    /// The transition was applied; `record_id` is the history record.
    Applied { record_id: i64 },
    /// Denied by the authorizer for the document's current status.
    SkippedInvalidTransition { reason: DenialReason },
    /// The document does not exist.
    SkippedNotFound,
    /// A concurrent writer got there first; the document was left alone.
    SkippedConflict,
    /// A storage fault on this document only; the batch continued.
    Failed { error: String },
}

/// One document's line in a bulk summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkItemReport {
    pub doc: DocumentRef,
    pub outcome: BulkItemOutcome,
}

/// Summary of a bulk request. `applied` counts `Applied` outcomes;
/// `requested` always equals the number of refs submitted, so a partial
/// result is visible as `applied < requested`, never as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkTransitionResult {
    pub requested: usize,
    pub applied: usize,
    pub items: Vec<BulkItemReport>,
}

impl BulkTransitionResult {
    pub fn outcome_for(&self, doc: &DocumentRef) -> Option<&BulkItemOutcome> {
        self.items
            .iter()
            .find(|item| &item.doc == doc)
            .map(|item| &item.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentKind;
    use crate::role::Role;

    #[test]
    fn transition_request_accepts_minimal_json() {
        let json = r#"{
            "doc": {"kind": "ordinance", "id": "2025-001"},
            "from_status": "draft",
            "to_status": "pending",
            "actor": {"id": "councilor-3", "role": "councilor"}
        }"#;
        let request: TransitionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.doc, DocumentRef::new(DocumentKind::Ordinance, "2025-001"));
        assert_eq!(request.actor.role, Role::Councilor);
        assert_eq!(request.notes, "");
        assert_eq!(request.next_step, None);
        assert_eq!(request.target_date, None);
    }

    #[test]
    fn bulk_outcomes_serialize_with_a_type_tag() {
        let applied = serde_json::to_value(BulkItemOutcome::Applied { record_id: 9 }).unwrap();
        assert_eq!(applied["type"], "Applied");
        assert_eq!(applied["record_id"], 9);

        let skipped = serde_json::to_value(BulkItemOutcome::SkippedNotFound).unwrap();
        assert_eq!(skipped["type"], "SkippedNotFound");
    }

    #[test]
    fn outcome_for_finds_the_matching_item() {
        let doc = DocumentRef::new(DocumentKind::Resolution, "r-1");
        let result = BulkTransitionResult {
            requested: 1,
            applied: 0,
            items: vec![BulkItemReport {
                doc: doc.clone(),
                outcome: BulkItemOutcome::SkippedNotFound,
            }],
        };
        assert_eq!(result.outcome_for(&doc), Some(&BulkItemOutcome::SkippedNotFound));
        let other = DocumentRef::new(DocumentKind::Ordinance, "r-1");
        assert_eq!(result.outcome_for(&other), None);
    }
}
