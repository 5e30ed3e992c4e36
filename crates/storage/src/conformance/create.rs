use std::future::Future;

use docket_core::Status;

use super::{ordinance, resolution, TestResult};
use crate::{DocketStore, StorageError};

pub(super) async fn run_create_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "create",
        "create_document_at_draft_version_0",
        create_document_at_draft_version_0(factory).await,
    ));
    results.push(TestResult::from_result(
        "create",
        "create_sets_created_by_and_no_approver",
        create_sets_created_by_and_no_approver(factory).await,
    ));
    results.push(TestResult::from_result(
        "create",
        "created_document_readable_via_get_document",
        created_document_readable_via_get_document(factory).await,
    ));
    results.push(TestResult::from_result(
        "create",
        "created_document_readable_for_update",
        created_document_readable_for_update(factory).await,
    ));
    results.push(TestResult::from_result(
        "create",
        "double_create_returns_already_exists",
        double_create_returns_already_exists(factory).await,
    ));
    results.push(TestResult::from_result(
        "create",
        "double_create_across_snapshots",
        double_create_across_snapshots(factory).await,
    ));
    results.push(TestResult::from_result(
        "create",
        "already_exists_error_has_correct_fields",
        already_exists_error_has_correct_fields(factory).await,
    ));
    results.push(TestResult::from_result(
        "create",
        "different_ids_are_independent",
        different_ids_are_independent(factory).await,
    ));
    results.push(TestResult::from_result(
        "create",
        "different_kinds_are_independent",
        different_kinds_are_independent(factory).await,
    ));
    results.push(TestResult::from_result(
        "create",
        "create_not_visible_before_commit",
        create_not_visible_before_commit(factory).await,
    ));
    results.push(TestResult::from_result(
        "create",
        "create_not_visible_after_abort",
        create_not_visible_after_abort(factory).await,
    ));
    results.push(TestResult::from_result(
        "create",
        "created_document_updatable",
        created_document_updatable(factory).await,
    ));
    results.push(TestResult::from_result(
        "create",
        "get_document_unknown_returns_not_found",
        get_document_unknown_returns_not_found(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

/// After create + commit, the document must be at status `draft`, version 0.
async fn create_document_at_draft_version_0<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.create_document(&mut snap, &doc, "clerk")
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let rec = s.get_document(&doc).await.map_err(|e| e.to_string())?;
    if rec.status != Status::Draft {
        return Err(format!("expected status draft, got {}", rec.status));
    }
    if rec.version != 0 {
        return Err(format!("expected version 0, got {}", rec.version));
    }
    Ok(())
}

/// After create, created_by must be stored and approved_by must be None.
async fn create_sets_created_by_and_no_approver<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.create_document(&mut snap, &doc, "clerk-9")
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let rec = s.get_document(&doc).await.map_err(|e| e.to_string())?;
    if rec.created_by != "clerk-9" {
        return Err(format!(
            "expected created_by \"clerk-9\", got \"{}\"",
            rec.created_by
        ));
    }
    if rec.approved_by.is_some() {
        return Err(format!(
            "expected approved_by to be None, got {:?}",
            rec.approved_by
        ));
    }
    Ok(())
}

/// After create + commit, get_document must return the right identity.
async fn created_document_readable_via_get_document<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.create_document(&mut snap, &doc, "clerk")
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let rec = s.get_document(&doc).await.map_err(|e| e.to_string())?;
    if rec.doc != doc {
        return Err(format!("expected {doc}, got {}", rec.doc));
    }
    Ok(())
}

/// After create + commit, get_document_for_update in a new snapshot must succeed.
async fn created_document_readable_for_update<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.create_document(&mut snap, &doc, "clerk")
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let mut snap2 = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let rec = s
        .get_document_for_update(&mut snap2, &doc)
        .await
        .map_err(|e| e.to_string())?;
    s.abort_snapshot(snap2).await.map_err(|e| e.to_string())?;

    if rec.doc != doc {
        return Err(format!("expected {doc}, got {}", rec.doc));
    }
    Ok(())
}

/// Creating the same document twice in the same snapshot must return AlreadyExists.
async fn double_create_returns_already_exists<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.create_document(&mut snap, &doc, "clerk")
        .await
        .map_err(|e| e.to_string())?;

    let result = s.create_document(&mut snap, &doc, "clerk").await;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    match result {
        Err(ref e) if matches!(e, StorageError::AlreadyExists { .. }) => Ok(()),
        Err(e) => Err(format!("expected AlreadyExists, got: {e}")),
        Ok(()) => Err("expected AlreadyExists error, but got Ok".to_string()),
    }
}

/// Creating the same document in a second snapshot after committing the first
/// must return AlreadyExists, whatever status the document has reached.
async fn double_create_across_snapshots<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.create_document(&mut snap, &doc, "clerk")
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    // Move it off draft first; existence, not status, is what matters.
    let mut snap2 = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.update_status(&mut snap2, &doc, 0, Status::Pending, None)
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap2).await.map_err(|e| e.to_string())?;

    let mut snap3 = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let result = s.create_document(&mut snap3, &doc, "clerk").await;
    s.abort_snapshot(snap3).await.map_err(|e| e.to_string())?;

    match result {
        Err(ref e) if matches!(e, StorageError::AlreadyExists { .. }) => Ok(()),
        Err(e) => Err(format!("expected AlreadyExists, got: {e}")),
        Ok(()) => Err("expected AlreadyExists error, but got Ok".to_string()),
    }
}

/// The AlreadyExists error must carry the offending document ref.
async fn already_exists_error_has_correct_fields<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.create_document(&mut snap, &doc, "clerk")
        .await
        .map_err(|e| e.to_string())?;

    let result = s.create_document(&mut snap, &doc, "clerk").await;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    match result {
        Err(StorageError::AlreadyExists { doc: got }) => {
            if got != doc {
                return Err(format!("expected doc {doc}, got {got}"));
            }
            Ok(())
        }
        Err(e) => Err(format!("expected AlreadyExists, got: {e}")),
        Ok(()) => Err("expected AlreadyExists error, but got Ok".to_string()),
    }
}

/// The same kind with different ids must create independently.
async fn different_ids_are_independent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.create_document(&mut snap, &ordinance("ord-1"), "clerk")
        .await
        .map_err(|e| e.to_string())?;
    s.create_document(&mut snap, &ordinance("ord-2"), "clerk")
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let rec1 = s.get_document(&ordinance("ord-1")).await.map_err(|e| e.to_string())?;
    let rec2 = s.get_document(&ordinance("ord-2")).await.map_err(|e| e.to_string())?;
    if rec1.doc.id != "ord-1" || rec2.doc.id != "ord-2" {
        return Err("document ids do not match expected values".to_string());
    }
    Ok(())
}

/// Different kinds with the same id must create independently.
async fn different_kinds_are_independent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.create_document(&mut snap, &ordinance("2025-7"), "clerk")
        .await
        .map_err(|e| e.to_string())?;
    s.create_document(&mut snap, &resolution("2025-7"), "clerk")
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    s.get_document(&ordinance("2025-7")).await.map_err(|e| e.to_string())?;
    s.get_document(&resolution("2025-7")).await.map_err(|e| e.to_string())?;
    Ok(())
}

/// Before committing a snapshot, the created document must NOT be visible
/// to read-path queries (get_document operates outside the snapshot).
async fn create_not_visible_before_commit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.create_document(&mut snap, &doc, "clerk")
        .await
        .map_err(|e| e.to_string())?;

    // Snapshot is still open -- document should not be visible outside it.
    let result = s.get_document(&doc).await;
    // Clean up the snapshot regardless of the check outcome.
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    match result {
        Err(ref e) if matches!(e, StorageError::DocumentNotFound { .. }) => Ok(()),
        Err(e) => Err(format!("expected DocumentNotFound, got: {e}")),
        Ok(_) => Err("document should not be visible before commit".to_string()),
    }
}

/// After create + abort, the document must NOT exist.
async fn create_not_visible_after_abort<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.create_document(&mut snap, &doc, "clerk")
        .await
        .map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    let result = s.get_document(&doc).await;
    match result {
        Err(ref e) if matches!(e, StorageError::DocumentNotFound { .. }) => Ok(()),
        Err(e) => Err(format!("expected DocumentNotFound, got: {e}")),
        Ok(_) => Err("document should not be visible after abort".to_string()),
    }
}

/// A created document can be updated via update_status in a subsequent snapshot.
async fn created_document_updatable<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.create_document(&mut snap, &doc, "clerk")
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let mut snap2 = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let new_version = s
        .update_status(&mut snap2, &doc, 0, Status::Pending, None)
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap2).await.map_err(|e| e.to_string())?;

    if new_version != 1 {
        return Err(format!("expected new version 1, got {new_version}"));
    }
    let rec = s.get_document(&doc).await.map_err(|e| e.to_string())?;
    if rec.status != Status::Pending {
        return Err(format!("expected status pending, got {}", rec.status));
    }
    if rec.version != 1 {
        return Err(format!("expected version 1, got {}", rec.version));
    }
    Ok(())
}

/// get_document for a document that was never created must return DocumentNotFound.
async fn get_document_unknown_returns_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let result = s.get_document(&ordinance("nope")).await;
    match result {
        Err(ref e) if matches!(e, StorageError::DocumentNotFound { .. }) => Ok(()),
        Err(e) => Err(format!("expected DocumentNotFound, got: {e}")),
        Ok(_) => Err("expected DocumentNotFound, but got a record".to_string()),
    }
}
