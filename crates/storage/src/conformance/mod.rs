//! Backend-agnostic conformance suite for [`DocketStore`] implementations.
//!
//! Every storage backend must behave identically under the contract: creation
//! and duplicate detection, all-or-nothing commits of status plus history,
//! compare-and-set version checks, append-only newest-first history, and
//! single-winner behavior under racing snapshots. The suite encodes those
//! obligations once so each backend crate only supplies a factory:
//!
//! ```ignore
//! use docket_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn mysql_store_conformance() {
//!     let report = run_conformance_suite(|| async { fresh_mysql_store().await }).await;
//!     assert_eq!(report.failed, 0, "{report}");
//! }
//! ```
//!
//! The factory runs once per test and must hand back a fresh, empty store.

mod commit;
mod concurrent;
mod create;
mod history;
mod version;

use std::fmt;
use std::future::Future;

use docket_core::{DocumentKind, DocumentRef, Status};

use crate::record::NewTransitionRecord;
use crate::DocketStore;

/// Verdict of one conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Suite category, e.g. "create" or "version".
    pub category: String,
    /// Individual test name within the category.
    pub name: String,
    pub passed: bool,
    /// Failure detail; `None` on pass.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        let (passed, message) = match result {
            Ok(()) => (true, None),
            Err(msg) => (false, Some(msg)),
        };
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed,
            message,
        }
    }
}

/// Everything a full suite run produced, with pass/fail tallies.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl ConformanceReport {
    fn tally(results: Vec<TestResult>) -> Self {
        let failed = results.iter().filter(|r| !r.passed).count();
        let total = results.len();
        Self {
            results,
            passed: total - failed,
            failed,
            total,
        }
    }

    fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| !r.passed)
    }
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}/{} checks passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for failure in self.failures() {
            let detail = failure.message.as_deref().unwrap_or("no detail");
            writeln!(f, "  FAIL {}::{}: {}", failure.category, failure.name, detail)?;
        }
        Ok(())
    }
}

/// Run every conformance category against the backend produced by `factory`.
///
/// Each test gets its own store, so state never leaks between them.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: DocketStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = create::run_create_tests(&factory).await;
    results.append(&mut commit::run_commit_tests(&factory).await);
    results.append(&mut version::run_version_tests(&factory).await);
    results.append(&mut history::run_history_tests(&factory).await);
    results.append(&mut concurrent::run_concurrent_tests(&factory).await);
    ConformanceReport::tally(results)
}

// ── Helpers: refs and record constructors with sensible defaults ──────────────

fn ordinance(id: &str) -> DocumentRef {
    DocumentRef::new(DocumentKind::Ordinance, id)
}

fn resolution(id: &str) -> DocumentRef {
    DocumentRef::new(DocumentKind::Resolution, id)
}

fn make_transition(
    doc: &DocumentRef,
    from: Status,
    to: Status,
    from_version: i64,
) -> NewTransitionRecord {
    NewTransitionRecord {
        doc: doc.clone(),
        from_status: from,
        to_status: to,
        notes: "conformance".to_string(),
        changed_by: "test-actor".to_string(),
        next_step: None,
        target_date: None,
        from_version,
        to_version: from_version + 1,
    }
}
