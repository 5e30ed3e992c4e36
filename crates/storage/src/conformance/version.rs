use std::future::Future;

use docket_core::Status;

use super::{ordinance, TestResult};
use crate::{DocketStore, StorageError};

pub(super) async fn run_version_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    // Basic version tracking
    results.push(TestResult::from_result(
        "version",
        "update_increments_version_by_one",
        update_increments_version_by_one(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "versions_climb_across_sequential_updates",
        versions_climb_across_sequential_updates(factory).await,
    ));

    // Wrong version fails
    results.push(TestResult::from_result(
        "version",
        "update_with_stale_version_returns_conflicting_state",
        update_with_stale_version_returns_conflicting_state(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "update_with_future_version_returns_conflicting_state",
        update_with_future_version_returns_conflicting_state(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "update_with_negative_version_returns_conflicting_state",
        update_with_negative_version_returns_conflicting_state(factory).await,
    ));

    // Conflict error contract
    results.push(TestResult::from_result(
        "version",
        "conflicting_state_error_has_correct_fields",
        conflicting_state_error_has_correct_fields(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "failed_cas_does_not_mutate_state",
        failed_cas_does_not_mutate_state(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "update_unknown_document_returns_not_found",
        update_unknown_document_returns_not_found(factory).await,
    ));

    // Race conditions (sequential simulation)
    results.push(TestResult::from_result(
        "version",
        "two_snapshots_race_one_wins",
        two_snapshots_race_one_wins(factory).await,
    ));

    // Per-document independence
    results.push(TestResult::from_result(
        "version",
        "versions_are_per_document",
        versions_are_per_document(factory).await,
    ));

    // get_document_for_update
    results.push(TestResult::from_result(
        "version",
        "get_for_update_reflects_committed_version",
        get_for_update_reflects_committed_version(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "get_for_update_unknown_returns_not_found",
        get_for_update_unknown_returns_not_found(factory).await,
    ));

    // Sequential within same snapshot
    results.push(TestResult::from_result(
        "version",
        "second_update_in_same_snapshot_uses_new_version",
        second_update_in_same_snapshot_uses_new_version(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "update_after_create_in_same_snapshot",
        update_after_create_in_same_snapshot(factory).await,
    ));

    results
}

// ── Helpers ───────────────────────────────────────────────────────────────────

async fn seed<S: DocketStore>(s: &S, doc: &docket_core::DocumentRef) -> Result<(), String> {
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.create_document(&mut snap, doc, "clerk")
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;
    Ok(())
}

async fn update_once<S: DocketStore>(
    s: &S,
    doc: &docket_core::DocumentRef,
    expected_version: i64,
    status: Status,
) -> Result<i64, String> {
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let version = s
        .update_status(&mut snap, doc, expected_version, status, None)
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;
    Ok(version)
}

// ── Test implementations ──────────────────────────────────────────────────────

/// One committed update raises the version from 0 to 1.
async fn update_increments_version_by_one<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    seed(&s, &doc).await?;

    let returned = update_once(&s, &doc, 0, Status::Pending).await?;
    if returned != 1 {
        return Err(format!("update_status returned {returned}, expected 1"));
    }
    let rec = s.get_document(&doc).await.map_err(|e| e.to_string())?;
    if rec.version != 1 {
        return Err(format!("stored version {}, expected 1", rec.version));
    }
    Ok(())
}

/// A chain of committed updates yields versions 1, 2, 3 in order.
async fn versions_climb_across_sequential_updates<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    seed(&s, &doc).await?;

    let path = [Status::Pending, Status::UnderReview, Status::CommitteeReview];
    let mut expected = 0;
    for status in path {
        let version = update_once(&s, &doc, expected, status).await?;
        expected += 1;
        if version != expected {
            return Err(format!("expected version {expected}, got {version}"));
        }
    }
    Ok(())
}

/// Retrying with the pre-update version after someone else committed must
/// return ConflictingState.
async fn update_with_stale_version_returns_conflicting_state<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    seed(&s, &doc).await?;
    update_once(&s, &doc, 0, Status::Pending).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let result = s
        .update_status(&mut snap, &doc, 0, Status::UnderReview, None)
        .await;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    match result {
        Err(ref e) if matches!(e, StorageError::ConflictingState { .. }) => Ok(()),
        Err(e) => Err(format!("expected ConflictingState, got: {e}")),
        Ok(v) => Err(format!("expected ConflictingState, got new version {v}")),
    }
}

/// A version the document has not reached yet must conflict.
async fn update_with_future_version_returns_conflicting_state<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    seed(&s, &doc).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let result = s.update_status(&mut snap, &doc, 5, Status::Pending, None).await;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    match result {
        Err(ref e) if matches!(e, StorageError::ConflictingState { .. }) => Ok(()),
        Err(e) => Err(format!("expected ConflictingState, got: {e}")),
        Ok(v) => Err(format!("expected ConflictingState, got new version {v}")),
    }
}

/// Negative versions never match anything.
async fn update_with_negative_version_returns_conflicting_state<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    seed(&s, &doc).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let result = s.update_status(&mut snap, &doc, -1, Status::Pending, None).await;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    match result {
        Err(ref e) if matches!(e, StorageError::ConflictingState { .. }) => Ok(()),
        Err(e) => Err(format!("expected ConflictingState, got: {e}")),
        Ok(v) => Err(format!("expected ConflictingState, got new version {v}")),
    }
}

/// The ConflictingState error must carry the document ref and the version
/// the caller expected.
async fn conflicting_state_error_has_correct_fields<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    seed(&s, &doc).await?;
    update_once(&s, &doc, 0, Status::Pending).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let result = s
        .update_status(&mut snap, &doc, 0, Status::UnderReview, None)
        .await;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    match result {
        Err(StorageError::ConflictingState {
            doc: got,
            expected_version,
        }) => {
            if got != doc {
                return Err(format!("expected doc {doc}, got {got}"));
            }
            if expected_version != 0 {
                return Err(format!(
                    "expected expected_version 0, got {expected_version}"
                ));
            }
            Ok(())
        }
        Err(e) => Err(format!("expected ConflictingState, got: {e}")),
        Ok(v) => Err(format!("expected ConflictingState, got new version {v}")),
    }
}

/// A failed compare-and-set leaves status and version exactly as they were.
async fn failed_cas_does_not_mutate_state<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    seed(&s, &doc).await?;
    update_once(&s, &doc, 0, Status::Pending).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let _ = s
        .update_status(&mut snap, &doc, 0, Status::Cancelled, None)
        .await;
    // Commit rather than abort: the failed CAS must have staged nothing.
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let rec = s.get_document(&doc).await.map_err(|e| e.to_string())?;
    if rec.status != Status::Pending || rec.version != 1 {
        return Err(format!(
            "failed CAS mutated state: status {}, version {}",
            rec.status, rec.version
        ));
    }
    Ok(())
}

/// Updating a document that does not exist must return DocumentNotFound,
/// not a conflict.
async fn update_unknown_document_returns_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let result = s
        .update_status(&mut snap, &ordinance("ghost"), 0, Status::Pending, None)
        .await;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    match result {
        Err(ref e) if matches!(e, StorageError::DocumentNotFound { .. }) => Ok(()),
        Err(e) => Err(format!("expected DocumentNotFound, got: {e}")),
        Ok(v) => Err(format!("expected DocumentNotFound, got new version {v}")),
    }
}

/// Two snapshots read the same version; the first to commit wins, the
/// second's compare-and-set must fail.
async fn two_snapshots_race_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    seed(&s, &doc).await?;

    let mut snap1 = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let mut snap2 = s.begin_snapshot().await.map_err(|e| e.to_string())?;

    let rec1 = s
        .get_document_for_update(&mut snap1, &doc)
        .await
        .map_err(|e| e.to_string())?;
    let rec2 = s
        .get_document_for_update(&mut snap2, &doc)
        .await
        .map_err(|e| e.to_string())?;
    if rec1.version != 0 || rec2.version != 0 {
        return Err("both snapshots should have read version 0".to_string());
    }

    // snap1 wins.
    s.update_status(&mut snap1, &doc, 0, Status::Pending, None)
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap1).await.map_err(|e| e.to_string())?;

    // snap2 loses.
    let result = s
        .update_status(&mut snap2, &doc, 0, Status::Cancelled, None)
        .await;
    s.abort_snapshot(snap2).await.map_err(|e| e.to_string())?;

    match result {
        Err(ref e) if matches!(e, StorageError::ConflictingState { .. }) => {}
        Err(e) => return Err(format!("expected ConflictingState, got: {e}")),
        Ok(v) => return Err(format!("loser's CAS succeeded with version {v}")),
    }

    let rec = s.get_document(&doc).await.map_err(|e| e.to_string())?;
    if rec.status != Status::Pending || rec.version != 1 {
        return Err(format!(
            "winner's state did not persist: status {}, version {}",
            rec.status, rec.version
        ));
    }
    Ok(())
}

/// Updating one document never bumps another's version.
async fn versions_are_per_document<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc_a = ordinance("ord-a");
    let doc_b = ordinance("ord-b");
    seed(&s, &doc_a).await?;
    seed(&s, &doc_b).await?;

    update_once(&s, &doc_a, 0, Status::Pending).await?;
    update_once(&s, &doc_a, 1, Status::UnderReview).await?;

    let b = s.get_document(&doc_b).await.map_err(|e| e.to_string())?;
    if b.version != 0 {
        return Err(format!("doc-b version moved to {}", b.version));
    }
    // doc-b's CAS still works against version 0.
    update_once(&s, &doc_b, 0, Status::Pending).await?;
    Ok(())
}

/// get_document_for_update returns the latest committed version.
async fn get_for_update_reflects_committed_version<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    seed(&s, &doc).await?;
    update_once(&s, &doc, 0, Status::Pending).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let rec = s
        .get_document_for_update(&mut snap, &doc)
        .await
        .map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    if rec.version != 1 || rec.status != Status::Pending {
        return Err(format!(
            "expected pending/1, got {}/{}",
            rec.status, rec.version
        ));
    }
    Ok(())
}

/// get_document_for_update on an unknown document must return DocumentNotFound.
async fn get_for_update_unknown_returns_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let result = s.get_document_for_update(&mut snap, &ordinance("ghost")).await;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    match result {
        Err(ref e) if matches!(e, StorageError::DocumentNotFound { .. }) => Ok(()),
        Err(e) => Err(format!("expected DocumentNotFound, got: {e}")),
        Ok(_) => Err("expected DocumentNotFound, but got a record".to_string()),
    }
}

/// Within one snapshot, a second update must use the version produced by
/// the first.
async fn second_update_in_same_snapshot_uses_new_version<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    seed(&s, &doc).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let v1 = s
        .update_status(&mut snap, &doc, 0, Status::Pending, None)
        .await
        .map_err(|e| e.to_string())?;
    let v2 = s
        .update_status(&mut snap, &doc, v1, Status::UnderReview, None)
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    if v1 != 1 || v2 != 2 {
        return Err(format!("expected versions 1 and 2, got {v1} and {v2}"));
    }
    let rec = s.get_document(&doc).await.map_err(|e| e.to_string())?;
    if rec.status != Status::UnderReview || rec.version != 2 {
        return Err(format!(
            "expected under_review/2, got {}/{}",
            rec.status, rec.version
        ));
    }
    Ok(())
}

/// A document created earlier in the same snapshot is updatable at
/// version 0 before the snapshot commits.
async fn update_after_create_in_same_snapshot<S, F, Fut>(factory: &F) -> Result<(), String>
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
    let version = s
        .update_status(&mut snap, &doc, 0, Status::Pending, None)
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    if version != 1 {
        return Err(format!("expected version 1, got {version}"));
    }
    let rec = s.get_document(&doc).await.map_err(|e| e.to_string())?;
    if rec.status != Status::Pending {
        return Err(format!("expected pending, got {}", rec.status));
    }
    Ok(())
}
