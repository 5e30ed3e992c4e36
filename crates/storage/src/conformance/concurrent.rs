use std::future::Future;
use std::sync::Arc;

use docket_core::{DocumentRef, Status};

use super::{ordinance, TestResult};
use crate::{DocketStore, StorageError};

/// How many tasks contend in each race.
const RACERS: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "concurrent",
        "racing_status_updates_have_one_winner",
        racing_status_updates_have_one_winner(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "racing_creates_have_one_winner",
        racing_creates_have_one_winner(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "uncontended_documents_update_in_parallel",
        uncontended_documents_update_in_parallel(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "race_leaves_a_single_coherent_standing",
        race_leaves_a_single_coherent_standing(factory).await,
    ));

    results
}

// ── Helpers ───────────────────────────────────────────────────────────────────

async fn seed<S: DocketStore>(s: &S, doc: &DocumentRef) -> Result<(), String> {
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.create_document(&mut snap, doc, "clerk")
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;
    Ok(())
}

// ── Same-document update race ─────────────────────────────────────────────────

/// RACERS tasks spawned with `tokio::spawn` all try to move one document off
/// version 0 at once. The compare-and-set must let exactly one commit through
/// and hand ConflictingState to everyone else. Unlike the sequential checks
/// in the `version` category, the interleaving here is real.
async fn racing_status_updates_have_one_winner<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    let doc = ordinance("ord-1");
    seed(store.as_ref(), &doc).await?;

    let mut handles = Vec::new();
    for _ in 0..RACERS {
        let s = store.clone();
        let doc = doc.clone();
        handles.push(tokio::spawn(async move {
            let mut snap = s.begin_snapshot().await?;
            match s.update_status(&mut snap, &doc, 0, Status::Pending, None).await {
                Ok(_) => {
                    s.commit_snapshot(snap).await?;
                    Ok(true)
                }
                Err(StorageError::ConflictingState { .. }) => {
                    s.abort_snapshot(snap).await?;
                    Ok(false)
                }
                Err(e) => {
                    let _ = s.abort_snapshot(snap).await;
                    Err(e)
                }
            }
        }));
    }

    let mut outcomes = Vec::with_capacity(RACERS);
    for handle in handles {
        let won: bool = handle
            .await
            .map_err(|e| format!("racing task panicked: {e}"))?
            .map_err(|e: StorageError| format!("unexpected storage error: {e}"))?;
        outcomes.push(won);
    }

    let winners = outcomes.iter().filter(|won| **won).count();
    if winners != 1 {
        return Err(format!(
            "one task should win the race, {winners} of {RACERS} did"
        ));
    }
    Ok(())
}

// ── Same-document create race ─────────────────────────────────────────────────

/// RACERS tasks all try to register the same (kind, id). One create commits,
/// the rest see AlreadyExists.
async fn racing_creates_have_one_winner<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    let doc = ordinance("ord-1");

    let mut handles = Vec::new();
    for _ in 0..RACERS {
        let s = store.clone();
        let doc = doc.clone();
        handles.push(tokio::spawn(async move {
            let mut snap = s.begin_snapshot().await?;
            match s.create_document(&mut snap, &doc, "clerk").await {
                Ok(()) => {
                    s.commit_snapshot(snap).await?;
                    Ok(true)
                }
                Err(StorageError::AlreadyExists { .. }) => {
                    s.abort_snapshot(snap).await?;
                    Ok(false)
                }
                Err(e) => {
                    let _ = s.abort_snapshot(snap).await;
                    Err(e)
                }
            }
        }));
    }

    let mut outcomes = Vec::with_capacity(RACERS);
    for handle in handles {
        let won: bool = handle
            .await
            .map_err(|e| format!("racing task panicked: {e}"))?
            .map_err(|e: StorageError| format!("unexpected storage error: {e}"))?;
        outcomes.push(won);
    }

    let winners = outcomes.iter().filter(|won| **won).count();
    if winners != 1 {
        return Err(format!("one create should win, {winners} of {RACERS} did"));
    }
    Ok(())
}

// ── Disjoint documents in parallel ────────────────────────────────────────────

/// Parallel updates to RACERS distinct documents must all commit. Contention
/// handling may not leak across document boundaries as false conflicts.
async fn uncontended_documents_update_in_parallel<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    for i in 0..RACERS {
        seed(store.as_ref(), &ordinance(&format!("ord-{i}"))).await?;
    }

    let mut handles = Vec::new();
    for i in 0..RACERS {
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            let doc = ordinance(&format!("ord-{i}"));
            let mut snap = s.begin_snapshot().await?;
            s.update_status(&mut snap, &doc, 0, Status::Pending, None)
                .await?;
            s.commit_snapshot(snap).await?;
            Ok::<(), StorageError>(())
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        handle
            .await
            .map_err(|e| format!("task for ord-{i} panicked: {e}"))?
            .map_err(|e| format!("update of ord-{i} was rejected: {e}"))?;
    }

    for i in 0..RACERS {
        let record = store
            .get_document(&ordinance(&format!("ord-{i}")))
            .await
            .map_err(|e| format!("get ord-{i}: {e}"))?;
        if record.status != Status::Pending || record.version != 1 {
            return Err(format!(
                "ord-{i} should be at pending v1, found {} v{}",
                record.status, record.version
            ));
        }
    }
    Ok(())
}

// ── State after a race ────────────────────────────────────────────────────────

/// Whatever the interleaving, the document a race was fought over ends up in
/// one coherent standing: the target status at version 1, visible to a plain
/// read.
async fn race_leaves_a_single_coherent_standing<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    let doc = ordinance("ord-1");
    seed(store.as_ref(), &doc).await?;

    let mut handles = Vec::new();
    for _ in 0..RACERS {
        let s = store.clone();
        let doc = doc.clone();
        handles.push(tokio::spawn(async move {
            let mut snap = s.begin_snapshot().await?;
            match s.update_status(&mut snap, &doc, 0, Status::Cancelled, None).await {
                Ok(_) => s.commit_snapshot(snap).await,
                Err(StorageError::ConflictingState { .. }) => s.abort_snapshot(snap).await,
                Err(e) => {
                    let _ = s.abort_snapshot(snap).await;
                    Err(e)
                }
            }
        }));
    }
    for handle in handles {
        handle
            .await
            .map_err(|e| format!("racing task panicked: {e}"))?
            .map_err(|e: StorageError| format!("unexpected storage error: {e}"))?;
    }

    let record = store.get_document(&doc).await.map_err(|e| format!("get: {e}"))?;
    if record.version != 1 {
        return Err(format!(
            "a single winning write should leave version 1, found {}",
            record.version
        ));
    }
    if record.status != Status::Cancelled {
        return Err(format!("expected status cancelled, found {}", record.status));
    }
    Ok(())
}
