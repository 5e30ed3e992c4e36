//! docket-core: domain model for the docket document workflow engine.
//!
//! Everything in this crate is pure: the closed status set, the directed
//! lifecycle graph, the role-based transition authorizer, and the
//! request/result shapes the other crates exchange. Nothing here performs
//! I/O or holds state, which is what lets the authorizer answer "could
//! this move happen?" without a store in hand.
//!
//! # Public API
//!
//! Key types are re-exported at the crate root for convenience:
//!
//! - [`Status`] -- the twelve lifecycle statuses
//! - [`DocumentKind`], [`DocumentRef`] -- document identity
//! - [`Role`], [`Actor`] -- who is asking
//! - [`authorize()`], [`DenialReason`] -- the transition gate
//! - [`TransitionRequest`], [`BulkTransitionRequest`] -- inputs
//! - [`BulkTransitionResult`] -- bulk summary
//!
//! The graph itself lives in [`graph`]; [`graph::successors_of`] is the
//! authoritative edge set.

pub mod authorize;
pub mod document;
pub mod graph;
pub mod request;
pub mod role;
pub mod status;

// ── Convenience re-exports ───────────────────────────────────────────

pub use authorize::{authorize, available_targets, is_allowed, DenialReason, PRIVILEGED_TARGETS};
pub use document::{DocumentKind, DocumentRef};
pub use request::{
    BulkItemOutcome, BulkItemReport, BulkTransitionRequest, BulkTransitionResult,
    TransitionRequest,
};
pub use role::{Actor, Role};
pub use status::Status;
