//! docket-engine: transition execution for the docket document workflow.
//!
//! The engine sits between the pure domain model in `docket-core` and a
//! transactional `DocketStore` backend. [`execute`] drives one document
//! through one lifecycle edge in a single snapshot; [`execute_bulk`]
//! applies the same move to many documents best-effort, one snapshot per
//! document; [`available_transitions`] answers "where can this document
//! go next for this role". The [`audit`] module carries the advisory
//! audit trail recorded alongside (never inside) the transaction.

pub mod audit;
pub mod available;
pub mod bulk;
pub mod executor;

#[cfg(test)]
mod testutil;

// ── Convenience re-exports ───────────────────────────────────────────

pub use audit::{AuditAction, AuditError, AuditEvent, AuditSink, MemoryAuditSink};
pub use available::{available_transitions, DocumentTransitions};
pub use bulk::execute_bulk;
pub use executor::{execute, EngineError, TransitionOutcome};
