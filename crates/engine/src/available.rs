//! Role-aware view of where a document can go next.

use serde::Serialize;

use docket_core::{available_targets, DocumentRef, Role, Status};
use docket_storage::DocketStore;

use crate::executor::EngineError;

/// A document's current standing joined with the destinations a role may
/// move it to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentTransitions {
    pub doc: DocumentRef,
    pub current_status: Status,
    pub targets: Vec<Status>,
}

/// Read `doc`'s current status and list the destinations `role` may move
/// it to, in lifecycle-graph order.
///
/// A missing document surfaces as `EngineError::Storage(DocumentNotFound)`
/// for the caller to map.
pub async fn available_transitions<S: DocketStore>(
    storage: &S,
    doc: &DocumentRef,
    role: Role,
) -> Result<DocumentTransitions, EngineError> {
    let record = storage.get_document(doc).await?;
    Ok(DocumentTransitions {
        doc: record.doc,
        current_status: record.status,
        targets: available_targets(record.status, role),
    })
}
