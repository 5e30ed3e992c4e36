//! HTTP route handlers: health, graph, documents, transitions, history.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use docket_core::{
    BulkTransitionRequest, DocumentKind, DocumentRef, Role, Status, TransitionRequest,
};
use docket_engine::{
    available_transitions, execute, execute_bulk, AuditEvent, AuditSink, EngineError,
    TransitionOutcome,
};
use docket_storage::{DocketStore, StorageError};

use super::json_error;
use super::state::AppState;

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

/// GET /graph
///
/// The graph is fixed at compile time, so the ETag is stable for the
/// lifetime of the binary and conditional requests can skip the body.
pub(crate) async fn handle_graph(headers: HeaderMap) -> Response {
    let graph = crate::graph::graph_value();
    let etag = crate::graph::compute_etag(&graph);
    let etag_quoted = format!("\"{}\"", etag);

    // If-None-Match matching the current ETag (quoted or bare) -> 304
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH) {
        if let Ok(inm) = if_none_match.to_str() {
            if inm == etag_quoted || inm == etag {
                return StatusCode::NOT_MODIFIED.into_response();
            }
        }
    }

    let mut response = (StatusCode::OK, Json(graph)).into_response();
    if let Ok(val) = etag_quoted.parse() {
        response.headers_mut().insert(header::ETAG, val);
    }
    response
}

/// Map a storage fault to 503 (backend unreachable) or 500 (anything else).
fn storage_error(e: &StorageError) -> Response {
    let status = if e.is_unavailable() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    json_error(status, &e.to_string()).into_response()
}

fn not_found_error(doc: &DocumentRef) -> Response {
    json_error(
        StatusCode::NOT_FOUND,
        &format!("document '{}' not found", doc),
    )
    .into_response()
}

/// Parse the `{kind}/{id}` path segments into a document ref.
fn parse_doc(kind: &str, id: &str) -> Result<DocumentRef, Response> {
    match kind.parse::<DocumentKind>() {
        Ok(kind) => Ok(DocumentRef::new(kind, id)),
        Err(e) => Err(json_error(StatusCode::BAD_REQUEST, &e.to_string()).into_response()),
    }
}

/// Query parameters for GET /documents.
#[derive(Deserialize)]
pub(crate) struct ListQuery {
    kind: Option<DocumentKind>,
    status: Option<Status>,
}

/// GET /documents
pub(crate) async fn handle_list_documents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Response {
    match state.store.list_documents(query.kind, query.status).await {
        Ok(documents) => (
            StatusCode::OK,
            Json(serde_json::json!({ "documents": documents })),
        )
            .into_response(),
        Err(e) => storage_error(&e),
    }
}

/// Body of POST /documents.
#[derive(Deserialize)]
pub(crate) struct CreateDocumentRequest {
    kind: DocumentKind,
    id: String,
    created_by: String,
}

/// POST /documents
///
/// Registers a document at `draft`, version 0. A duplicate (kind, id) is
/// a 409 regardless of how far the existing document has moved since.
pub(crate) async fn handle_create_document(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateDocumentRequest>,
) -> Response {
    let doc = DocumentRef::new(request.kind, request.id);

    let mut snapshot = match state.store.begin_snapshot().await {
        Ok(s) => s,
        Err(e) => return storage_error(&e),
    };
    if let Err(e) = state
        .store
        .create_document(&mut snapshot, &doc, &request.created_by)
        .await
    {
        let _ = state.store.abort_snapshot(snapshot).await;
        return match e {
            StorageError::AlreadyExists { .. } => {
                json_error(StatusCode::CONFLICT, &e.to_string()).into_response()
            }
            _ => storage_error(&e),
        };
    }
    if let Err(e) = state.store.commit_snapshot(snapshot).await {
        return storage_error(&e);
    }

    let _ = state
        .audit
        .record(AuditEvent::create_document(&request.created_by, &doc))
        .await;

    match state.store.get_document(&doc).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => storage_error(&e),
    }
}

/// GET /documents/{kind}/{id}
pub(crate) async fn handle_get_document(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
) -> Response {
    let doc = match parse_doc(&kind, &id) {
        Ok(doc) => doc,
        Err(response) => return response,
    };
    match state.store.get_document(&doc).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(StorageError::DocumentNotFound { .. }) => not_found_error(&doc),
        Err(e) => storage_error(&e),
    }
}

/// Query parameters for GET /documents/{kind}/{id}/transitions.
#[derive(Deserialize)]
pub(crate) struct RoleQuery {
    role: Role,
}

/// GET /documents/{kind}/{id}/transitions?role=R
pub(crate) async fn handle_available_transitions(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
    Query(query): Query<RoleQuery>,
) -> Response {
    let doc = match parse_doc(&kind, &id) {
        Ok(doc) => doc,
        Err(response) => return response,
    };
    match available_transitions(&state.store, &doc, query.role).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(EngineError::Storage(StorageError::DocumentNotFound { .. })) => not_found_error(&doc),
        Err(EngineError::Storage(e)) => storage_error(&e),
    }
}

/// GET /documents/{kind}/{id}/history
pub(crate) async fn handle_history(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
) -> Response {
    let doc = match parse_doc(&kind, &id) {
        Ok(doc) => doc,
        Err(response) => return response,
    };
    // history() reports no existence; the API distinguishes an unknown
    // document from one that has simply never moved
    if let Err(e) = state.store.get_document(&doc).await {
        return match e {
            StorageError::DocumentNotFound { .. } => not_found_error(&doc),
            _ => storage_error(&e),
        };
    }
    match state.store.history(&doc).await {
        Ok(history) => (
            StatusCode::OK,
            Json(serde_json::json!({ "history": history })),
        )
            .into_response(),
        Err(e) => storage_error(&e),
    }
}

/// POST /transitions
///
/// Status codes mirror the executor's outcomes: 200 applied, 422 denied,
/// 404 unknown document, 409 stale or lost race.
pub(crate) async fn handle_transition(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TransitionRequest>,
) -> Response {
    match execute(&state.store, &state.audit, &request).await {
        Ok(TransitionOutcome::Applied { record }) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "outcome": "applied",
                "record": record,
            })),
        )
            .into_response(),
        Ok(TransitionOutcome::Denied { reason }) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({
                "outcome": "denied",
                "reason": reason,
                "message": reason.to_string(),
            })),
        )
            .into_response(),
        Ok(TransitionOutcome::NotFound) => not_found_error(&request.doc),
        Ok(TransitionOutcome::Conflict { current }) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "outcome": "conflict",
                "current_status": current,
                "message": "state changed, please refresh and retry",
            })),
        )
            .into_response(),
        Err(EngineError::Storage(e)) => storage_error(&e),
    }
}

/// POST /transitions/bulk
///
/// Always 200 with a per-document report when the batch ran; partial
/// completion is visible in the body, not the status code. 503 only when
/// the backend went unavailable mid-batch.
pub(crate) async fn handle_bulk_transition(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BulkTransitionRequest>,
) -> Response {
    match execute_bulk(&state.store, &state.audit, &request).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(EngineError::Storage(e)) => storage_error(&e),
    }
}
