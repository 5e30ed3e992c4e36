use std::future::Future;

use docket_core::Status;

use super::{make_transition, ordinance, TestResult};
use crate::DocketStore;

pub(super) async fn run_commit_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    // Single document commit
    results.push(TestResult::from_result(
        "commit",
        "status_update_committed",
        status_update_committed(factory).await,
    ));
    results.push(TestResult::from_result(
        "commit",
        "status_update_not_visible_before_commit",
        status_update_not_visible_before_commit(factory).await,
    ));
    results.push(TestResult::from_result(
        "commit",
        "status_update_discarded_on_abort",
        status_update_discarded_on_abort(factory).await,
    ));

    // Status + history atomicity
    results.push(TestResult::from_result(
        "commit",
        "status_and_history_both_visible_after_commit",
        status_and_history_both_visible_after_commit(factory).await,
    ));
    results.push(TestResult::from_result(
        "commit",
        "status_and_history_neither_visible_after_abort",
        status_and_history_neither_visible_after_abort(factory).await,
    ));

    // Multi-document atomicity
    results.push(TestResult::from_result(
        "commit",
        "multi_document_updates_all_visible_after_commit",
        multi_document_updates_all_visible_after_commit(factory).await,
    ));
    results.push(TestResult::from_result(
        "commit",
        "multi_document_updates_none_visible_after_abort",
        multi_document_updates_none_visible_after_abort(factory).await,
    ));

    // Approver atomicity
    results.push(TestResult::from_result(
        "commit",
        "approver_written_with_status_in_one_commit",
        approver_written_with_status_in_one_commit(factory).await,
    ));
    results.push(TestResult::from_result(
        "commit",
        "approver_untouched_when_none_passed",
        approver_untouched_when_none_passed(factory).await,
    ));

    results
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Create a document and commit, leaving it at draft / version 0.
async fn seed<S: DocketStore>(
    s: &S,
    doc: &docket_core::DocumentRef,
) -> Result<(), String> {
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.create_document(&mut snap, doc, "clerk")
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;
    Ok(())
}

/// Walk a document along committed edges to the given status, one snapshot
/// per step. Returns the resulting version.
async fn advance<S: DocketStore>(
    s: &S,
    doc: &docket_core::DocumentRef,
    path: &[Status],
) -> Result<i64, String> {
    let mut version = s.get_document(doc).await.map_err(|e| e.to_string())?.version;
    for &status in path {
        let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
        version = s
            .update_status(&mut snap, doc, version, status, None)
            .await
            .map_err(|e| e.to_string())?;
        s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;
    }
    Ok(version)
}

// ── Test implementations ──────────────────────────────────────────────────────

/// An update followed by a commit is visible to get_document.
async fn status_update_committed<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    seed(&s, &doc).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.update_status(&mut snap, &doc, 0, Status::Pending, None)
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let rec = s.get_document(&doc).await.map_err(|e| e.to_string())?;
    if rec.status != Status::Pending {
        return Err(format!("expected pending, got {}", rec.status));
    }
    Ok(())
}

/// While the updating snapshot is open, read-path queries still see the
/// old status.
async fn status_update_not_visible_before_commit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    seed(&s, &doc).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.update_status(&mut snap, &doc, 0, Status::Pending, None)
        .await
        .map_err(|e| e.to_string())?;

    let rec = s.get_document(&doc).await.map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    if rec.status != Status::Draft {
        return Err(format!(
            "uncommitted update leaked: expected draft, got {}",
            rec.status
        ));
    }
    if rec.version != 0 {
        return Err(format!("expected version 0, got {}", rec.version));
    }
    Ok(())
}

/// An aborted update leaves status and version untouched.
async fn status_update_discarded_on_abort<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    seed(&s, &doc).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.update_status(&mut snap, &doc, 0, Status::Pending, None)
        .await
        .map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    let rec = s.get_document(&doc).await.map_err(|e| e.to_string())?;
    if rec.status != Status::Draft || rec.version != 0 {
        return Err(format!(
            "abort did not roll back: status {}, version {}",
            rec.status, rec.version
        ));
    }
    Ok(())
}

/// A status update and its history record, written in one snapshot, become
/// visible together on commit.
async fn status_and_history_both_visible_after_commit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    seed(&s, &doc).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.update_status(&mut snap, &doc, 0, Status::Pending, None)
        .await
        .map_err(|e| e.to_string())?;
    s.append_transition(&mut snap, make_transition(&doc, Status::Draft, Status::Pending, 0))
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let rec = s.get_document(&doc).await.map_err(|e| e.to_string())?;
    if rec.status != Status::Pending {
        return Err(format!("expected pending, got {}", rec.status));
    }
    let history = s.history(&doc).await.map_err(|e| e.to_string())?;
    if history.len() != 1 {
        return Err(format!("expected 1 history record, got {}", history.len()));
    }
    Ok(())
}

/// An aborted snapshot discards the status update AND its history record;
/// neither may surface alone.
async fn status_and_history_neither_visible_after_abort<S, F, Fut>(
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
    s.update_status(&mut snap, &doc, 0, Status::Pending, None)
        .await
        .map_err(|e| e.to_string())?;
    s.append_transition(&mut snap, make_transition(&doc, Status::Draft, Status::Pending, 0))
        .await
        .map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    let rec = s.get_document(&doc).await.map_err(|e| e.to_string())?;
    if rec.status != Status::Draft {
        return Err(format!("status leaked past abort: {}", rec.status));
    }
    let history = s.history(&doc).await.map_err(|e| e.to_string())?;
    if !history.is_empty() {
        return Err(format!(
            "history leaked past abort: {} records",
            history.len()
        ));
    }
    Ok(())
}

/// Updates to two documents in one snapshot commit together.
async fn multi_document_updates_all_visible_after_commit<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
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

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.update_status(&mut snap, &doc_a, 0, Status::Pending, None)
        .await
        .map_err(|e| e.to_string())?;
    s.update_status(&mut snap, &doc_b, 0, Status::Cancelled, None)
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let a = s.get_document(&doc_a).await.map_err(|e| e.to_string())?;
    let b = s.get_document(&doc_b).await.map_err(|e| e.to_string())?;
    if a.status != Status::Pending || b.status != Status::Cancelled {
        return Err(format!("expected pending/cancelled, got {}/{}", a.status, b.status));
    }
    Ok(())
}

/// Updates to two documents in one snapshot abort together.
async fn multi_document_updates_none_visible_after_abort<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
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

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.update_status(&mut snap, &doc_a, 0, Status::Pending, None)
        .await
        .map_err(|e| e.to_string())?;
    s.update_status(&mut snap, &doc_b, 0, Status::Cancelled, None)
        .await
        .map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    let a = s.get_document(&doc_a).await.map_err(|e| e.to_string())?;
    let b = s.get_document(&doc_b).await.map_err(|e| e.to_string())?;
    if a.status != Status::Draft || b.status != Status::Draft {
        return Err(format!("abort leaked: {}/{}", a.status, b.status));
    }
    Ok(())
}

/// Moving a document into `approved` with an approver writes both fields in
/// the same commit.
async fn approver_written_with_status_in_one_commit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    seed(&s, &doc).await?;
    let version = advance(
        &s,
        &doc,
        &[
            Status::Pending,
            Status::UnderReview,
            Status::CommitteeReview,
            Status::ForVoting,
        ],
    )
    .await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.update_status(&mut snap, &doc, version, Status::Approved, Some("admin-1"))
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let rec = s.get_document(&doc).await.map_err(|e| e.to_string())?;
    if rec.status != Status::Approved {
        return Err(format!("expected approved, got {}", rec.status));
    }
    if rec.approved_by.as_deref() != Some("admin-1") {
        return Err(format!(
            "expected approved_by \"admin-1\", got {:?}",
            rec.approved_by
        ));
    }
    Ok(())
}

/// An update passing `approved_by: None` leaves the stored approver alone.
async fn approver_untouched_when_none_passed<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    seed(&s, &doc).await?;
    let version = advance(
        &s,
        &doc,
        &[
            Status::Pending,
            Status::UnderReview,
            Status::CommitteeReview,
            Status::ForVoting,
        ],
    )
    .await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let version = s
        .update_status(&mut snap, &doc, version, Status::Approved, Some("admin-1"))
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    // approved -> amended passes no approver; the original must survive.
    let mut snap2 = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.update_status(&mut snap2, &doc, version, Status::Amended, None)
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap2).await.map_err(|e| e.to_string())?;

    let rec = s.get_document(&doc).await.map_err(|e| e.to_string())?;
    if rec.status != Status::Amended {
        return Err(format!("expected amended, got {}", rec.status));
    }
    if rec.approved_by.as_deref() != Some("admin-1") {
        return Err(format!(
            "expected approved_by to survive, got {:?}",
            rec.approved_by
        ));
    }
    Ok(())
}
