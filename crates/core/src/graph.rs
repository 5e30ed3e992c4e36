//! The lifecycle graph.
//!
//! A directed graph over [`Status`] fixed at compile time. Every question
//! about what moves are structurally possible is answered here; whether a
//! particular actor may make a move is the authorizer's business.

use crate::status::Status;

/// Statuses reachable from `status` in a single transition.
///
/// The returned slice is the authoritative edge set. An empty slice means
/// the status is terminal.
pub fn successors_of(status: Status) -> &'static [Status] {
    use Status::*;
    match status {
        Draft => &[Pending, Cancelled],
        Pending => &[UnderReview, Rejected, Cancelled],
        UnderReview => &[CommitteeReview, Amended, Rejected],
        CommitteeReview => &[ForVoting, Amended, Rejected],
        ForVoting => &[Approved, Rejected, Postponed],
        Approved => &[Implemented, Amended],
        Implemented => &[Archived],
        Amended => &[Pending, UnderReview],
        Postponed => &[ForVoting, Cancelled],
        Rejected => &[Draft, Archived],
        Cancelled => &[Archived],
        Archived => &[],
    }
}

/// Whether `from -> to` is an edge of the lifecycle graph.
pub fn is_edge(from: Status, to: Status) -> bool {
    successors_of(from).contains(&to)
}

/// Whether `status` has no outgoing edges.
pub fn is_terminal(status: Status) -> bool {
    successors_of(status).is_empty()
}

/// All edges of the graph, in `Status::ALL` order of the source status.
pub fn edges() -> impl Iterator<Item = (Status, Status)> {
    Status::ALL
        .iter()
        .flat_map(|&from| successors_of(from).iter().map(move |&to| (from, to)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use Status::*;

    #[test]
    fn archived_is_the_only_terminal_status() {
        for status in Status::ALL {
            assert_eq!(is_terminal(status), status == Archived, "{status}");
        }
    }

    #[test]
    fn the_graph_has_twenty_four_edges() {
        assert_eq!(edges().count(), 24);
    }

    #[test]
    fn no_status_has_a_self_edge() {
        for status in Status::ALL {
            assert!(!is_edge(status, status), "{status} -> {status}");
        }
    }

    #[test]
    fn rework_paths_exist() {
        // A rejected document can be redrafted, and an amended one re-enters
        // the review pipeline without starting over.
        assert!(is_edge(Rejected, Draft));
        assert!(is_edge(Amended, Pending));
        assert!(is_edge(Amended, UnderReview));
        assert!(is_edge(Postponed, ForVoting));
    }

    #[test]
    fn approval_is_reachable_only_from_for_voting() {
        let sources: Vec<Status> = Status::ALL
            .into_iter()
            .filter(|&from| is_edge(from, Approved))
            .collect();
        assert_eq!(sources, vec![ForVoting]);
    }

    #[test]
    fn every_nonterminal_status_reaches_a_terminal_one() {
        // Walk the graph from each status; every document can eventually be
        // archived (or is already).
        fn reaches_archived(from: Status, seen: &mut Vec<Status>) -> bool {
            if from == Archived {
                return true;
            }
            if seen.contains(&from) {
                return false;
            }
            seen.push(from);
            successors_of(from)
                .iter()
                .any(|&next| reaches_archived(next, seen))
        }
        for status in Status::ALL {
            assert!(reaches_archived(status, &mut Vec::new()), "{status}");
        }
    }

    #[test]
    fn edge_set_matches_the_published_lifecycle() {
        let expected: &[(Status, &[Status])] = &[
            (Draft, &[Pending, Cancelled]),
            (Pending, &[UnderReview, Rejected, Cancelled]),
            (UnderReview, &[CommitteeReview, Amended, Rejected]),
            (CommitteeReview, &[ForVoting, Amended, Rejected]),
            (ForVoting, &[Approved, Rejected, Postponed]),
            (Approved, &[Implemented, Amended]),
            (Implemented, &[Archived]),
            (Amended, &[Pending, UnderReview]),
            (Postponed, &[ForVoting, Cancelled]),
            (Rejected, &[Draft, Archived]),
            (Cancelled, &[Archived]),
            (Archived, &[]),
        ];
        for (from, targets) in expected {
            assert_eq!(successors_of(*from), *targets, "successors of {from}");
        }
    }
}
