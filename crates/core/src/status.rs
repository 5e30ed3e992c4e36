//! Document lifecycle statuses.
//!
//! The status set is closed: a document is always in exactly one of the
//! twelve statuses below, and nothing outside this enum is ever accepted
//! from the wire or the CLI. Unknown inputs fail at the parse boundary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a legislative document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Draft,
    Pending,
    UnderReview,
    CommitteeReview,
    ForVoting,
    Approved,
    Implemented,
    Amended,
    Postponed,
    Rejected,
    Cancelled,
    Archived,
}

impl Status {
    /// Every status, in lifecycle order. The order here is the order used
    /// by `docket graph` output and the `/graph` endpoint.
    pub const ALL: [Status; 12] = [
        Status::Draft,
        Status::Pending,
        Status::UnderReview,
        Status::CommitteeReview,
        Status::ForVoting,
        Status::Approved,
        Status::Implemented,
        Status::Amended,
        Status::Postponed,
        Status::Rejected,
        Status::Cancelled,
        Status::Archived,
    ];

    /// Canonical wire name (matches the serde representation).
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Draft => "draft",
            Status::Pending => "pending",
            Status::UnderReview => "under_review",
            Status::CommitteeReview => "committee_review",
            Status::ForVoting => "for_voting",
            Status::Approved => "approved",
            Status::Implemented => "implemented",
            Status::Amended => "amended",
            Status::Postponed => "postponed",
            Status::Rejected => "rejected",
            Status::Cancelled => "cancelled",
            Status::Archived => "archived",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a string that names no known status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}
