use std::future::Future;

use docket_core::Status;

use super::{make_transition, ordinance, TestResult};
use crate::record::NewTransitionRecord;
use crate::DocketStore;

pub(super) async fn run_history_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "history",
        "history_empty_for_fresh_document",
        history_empty_for_fresh_document(factory).await,
    ));
    results.push(TestResult::from_result(
        "history",
        "append_returns_completed_record",
        append_returns_completed_record(factory).await,
    ));
    results.push(TestResult::from_result(
        "history",
        "history_newest_first",
        history_newest_first(factory).await,
    ));
    results.push(TestResult::from_result(
        "history",
        "head_of_history_matches_current_standing",
        head_of_history_matches_current_standing(factory).await,
    ));
    results.push(TestResult::from_result(
        "history",
        "history_preserves_all_fields",
        history_preserves_all_fields(factory).await,
    ));
    results.push(TestResult::from_result(
        "history",
        "history_records_chain_by_version",
        history_records_chain_by_version(factory).await,
    ));
    results.push(TestResult::from_result(
        "history",
        "earlier_records_survive_later_transitions",
        earlier_records_survive_later_transitions(factory).await,
    ));
    results.push(TestResult::from_result(
        "history",
        "histories_are_per_document",
        histories_are_per_document(factory).await,
    ));
    results.push(TestResult::from_result(
        "history",
        "record_ids_strictly_increase",
        record_ids_strictly_increase(factory).await,
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

/// Apply one transition the way the executor does: update and append in the
/// same snapshot, then commit.
async fn transition_once<S: DocketStore>(
    s: &S,
    doc: &docket_core::DocumentRef,
    from: Status,
    to: Status,
    from_version: i64,
) -> Result<i64, String> {
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let version = s
        .update_status(&mut snap, doc, from_version, to, None)
        .await
        .map_err(|e| e.to_string())?;
    s.append_transition(&mut snap, make_transition(doc, from, to, from_version))
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;
    Ok(version)
}

// ── Test implementations ──────────────────────────────────────────────────────

/// A document with no applied transitions has an empty history, not an error.
async fn history_empty_for_fresh_document<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    seed(&s, &doc).await?;

    let history = s.history(&doc).await.map_err(|e| e.to_string())?;
    if !history.is_empty() {
        return Err(format!("expected empty history, got {} records", history.len()));
    }
    Ok(())
}

/// append_transition returns the record completed with a positive id and a
/// timestamp, preserving the submitted fields.
async fn append_returns_completed_record<S, F, Fut>(factory: &F) -> Result<(), String>
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
    let record = s
        .append_transition(&mut snap, make_transition(&doc, Status::Draft, Status::Pending, 0))
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    if record.id <= 0 {
        return Err(format!("expected a positive record id, got {}", record.id));
    }
    if record.changed_at.is_empty() {
        return Err("expected a store-assigned timestamp".to_string());
    }
    if record.from_status != Status::Draft || record.to_status != Status::Pending {
        return Err(format!(
            "expected draft -> pending, got {} -> {}",
            record.from_status, record.to_status
        ));
    }
    Ok(())
}

/// History returns the most recent transition first.
async fn history_newest_first<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    seed(&s, &doc).await?;

    transition_once(&s, &doc, Status::Draft, Status::Pending, 0).await?;
    transition_once(&s, &doc, Status::Pending, Status::UnderReview, 1).await?;
    transition_once(&s, &doc, Status::UnderReview, Status::CommitteeReview, 2).await?;

    let history = s.history(&doc).await.map_err(|e| e.to_string())?;
    if history.len() != 3 {
        return Err(format!("expected 3 records, got {}", history.len()));
    }
    let order: Vec<Status> = history.iter().map(|r| r.to_status).collect();
    let expected = [Status::CommitteeReview, Status::UnderReview, Status::Pending];
    if order != expected {
        return Err(format!("wrong order: {order:?}"));
    }
    Ok(())
}

/// The head of the history agrees with the document's current status and
/// version.
async fn head_of_history_matches_current_standing<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    seed(&s, &doc).await?;

    transition_once(&s, &doc, Status::Draft, Status::Pending, 0).await?;
    transition_once(&s, &doc, Status::Pending, Status::Rejected, 1).await?;

    let rec = s.get_document(&doc).await.map_err(|e| e.to_string())?;
    let history = s.history(&doc).await.map_err(|e| e.to_string())?;
    let head = history.first().ok_or("history is empty")?;

    if head.to_status != rec.status {
        return Err(format!(
            "head to_status {} does not match current status {}",
            head.to_status, rec.status
        ));
    }
    if head.to_version != rec.version {
        return Err(format!(
            "head to_version {} does not match current version {}",
            head.to_version, rec.version
        ));
    }
    Ok(())
}

/// Notes, actor, next step, and target date all come back as written.
async fn history_preserves_all_fields<S, F, Fut>(factory: &F) -> Result<(), String>
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
    s.append_transition(
        &mut snap,
        NewTransitionRecord {
            doc: doc.clone(),
            from_status: Status::Draft,
            to_status: Status::Pending,
            notes: "submitted for the spring session".to_string(),
            changed_by: "councilor-3".to_string(),
            next_step: Some("committee assignment".to_string()),
            target_date: Some("2025-04-01".to_string()),
            from_version: 0,
            to_version: 1,
        },
    )
    .await
    .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let history = s.history(&doc).await.map_err(|e| e.to_string())?;
    let record = history.first().ok_or("history is empty")?;
    if record.notes != "submitted for the spring session" {
        return Err(format!("notes mangled: \"{}\"", record.notes));
    }
    if record.changed_by != "councilor-3" {
        return Err(format!("changed_by mangled: \"{}\"", record.changed_by));
    }
    if record.next_step.as_deref() != Some("committee assignment") {
        return Err(format!("next_step mangled: {:?}", record.next_step));
    }
    if record.target_date.as_deref() != Some("2025-04-01") {
        return Err(format!("target_date mangled: {:?}", record.target_date));
    }
    if record.from_version != 0 || record.to_version != 1 {
        return Err(format!(
            "version fields mangled: {} -> {}",
            record.from_version, record.to_version
        ));
    }
    Ok(())
}

/// Consecutive records chain: each from_version equals the previous
/// to_version, reading oldest to newest.
async fn history_records_chain_by_version<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    seed(&s, &doc).await?;

    transition_once(&s, &doc, Status::Draft, Status::Pending, 0).await?;
    transition_once(&s, &doc, Status::Pending, Status::UnderReview, 1).await?;
    transition_once(&s, &doc, Status::UnderReview, Status::Amended, 2).await?;

    let mut history = s.history(&doc).await.map_err(|e| e.to_string())?;
    history.reverse(); // oldest first
    for pair in history.windows(2) {
        if pair[1].from_version != pair[0].to_version {
            return Err(format!(
                "broken chain: record {} ends at v{}, next starts at v{}",
                pair[0].id, pair[0].to_version, pair[1].from_version
            ));
        }
        if pair[1].from_status != pair[0].to_status {
            return Err(format!(
                "broken chain: record {} ends at {}, next starts at {}",
                pair[0].id, pair[0].to_status, pair[1].from_status
            ));
        }
    }
    Ok(())
}

/// History is append-only: records already written are byte-for-byte
/// untouched by later transitions.
async fn earlier_records_survive_later_transitions<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    seed(&s, &doc).await?;

    transition_once(&s, &doc, Status::Draft, Status::Pending, 0).await?;
    let before = s.history(&doc).await.map_err(|e| e.to_string())?;

    transition_once(&s, &doc, Status::Pending, Status::UnderReview, 1).await?;
    let after = s.history(&doc).await.map_err(|e| e.to_string())?;

    let tail = &after[1..];
    if tail != before.as_slice() {
        return Err("existing history records changed after a later transition".to_string());
    }
    Ok(())
}

/// Each document sees only its own history.
async fn histories_are_per_document<S, F, Fut>(factory: &F) -> Result<(), String>
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

    transition_once(&s, &doc_a, Status::Draft, Status::Pending, 0).await?;
    transition_once(&s, &doc_b, Status::Draft, Status::Cancelled, 0).await?;

    let history_a = s.history(&doc_a).await.map_err(|e| e.to_string())?;
    let history_b = s.history(&doc_b).await.map_err(|e| e.to_string())?;
    if history_a.len() != 1 || history_b.len() != 1 {
        return Err(format!(
            "expected 1 record each, got {} and {}",
            history_a.len(),
            history_b.len()
        ));
    }
    if history_a[0].doc != doc_a || history_b[0].doc != doc_b {
        return Err("records attributed to the wrong document".to_string());
    }
    Ok(())
}

/// Record ids strictly increase in append order.
async fn record_ids_strictly_increase<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let doc = ordinance("ord-1");
    seed(&s, &doc).await?;

    transition_once(&s, &doc, Status::Draft, Status::Pending, 0).await?;
    transition_once(&s, &doc, Status::Pending, Status::UnderReview, 1).await?;
    transition_once(&s, &doc, Status::UnderReview, Status::Rejected, 2).await?;

    let mut history = s.history(&doc).await.map_err(|e| e.to_string())?;
    history.reverse(); // oldest first
    for pair in history.windows(2) {
        if pair[1].id <= pair[0].id {
            return Err(format!(
                "ids not increasing: {} then {}",
                pair[0].id, pair[1].id
            ));
        }
    }
    Ok(())
}
