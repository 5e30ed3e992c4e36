//! Transition authorization.
//!
//! Two checks, applied in order: the move must be an edge of the lifecycle
//! graph, and if the destination is privileged the actor's role must be
//! privileged too. A failed check is a [`DenialReason`] value, not an
//! error; callers that treat denials as faults are holding it wrong.

use serde::{Deserialize, Serialize};

use crate::graph::{is_edge, successors_of};
use crate::role::Role;
use crate::status::Status;

/// Destinations only `super_admin` and `admin` may move documents into.
pub const PRIVILEGED_TARGETS: [Status; 3] =
    [Status::Approved, Status::Implemented, Status::Archived];

fn requires_privilege(to: Status) -> bool {
    PRIVILEGED_TARGETS.contains(&to)
}

/// Why a requested transition was denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DenialReason {
    /// `from -> to` is not an edge of the lifecycle graph.
    InvalidTransition { from: Status, to: Status },
    /// The edge exists, but the destination is privileged and the role
    /// is not.
    RoleNotPermitted { role: Role, to: Status },
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenialReason::InvalidTransition { from, to } => {
                write!(f, "no transition from '{from}' to '{to}' in the document lifecycle")
            }
            DenialReason::RoleNotPermitted { role, to } => {
                write!(
                    f,
                    "role '{role}' may not move documents to '{to}' (requires admin or super_admin)"
                )
            }
        }
    }
}

/// Check a transition, returning the reason when it is denied.
///
/// Graph membership is checked before the role gate, so an off-graph
/// request by an unprivileged actor reports `InvalidTransition`.
pub fn authorize(from: Status, to: Status, role: Role) -> Result<(), DenialReason> {
    if !is_edge(from, to) {
        return Err(DenialReason::InvalidTransition { from, to });
    }
    if requires_privilege(to) && !role.is_privileged() {
        return Err(DenialReason::RoleNotPermitted { role, to });
    }
    Ok(())
}

/// Boolean form of [`authorize`].
pub fn is_allowed(from: Status, to: Status, role: Role) -> bool {
    authorize(from, to, role).is_ok()
}

/// Destinations `role` may move a document in `from` into, in
/// `successors_of` order.
pub fn available_targets(from: Status, role: Role) -> Vec<Status> {
    successors_of(from)
        .iter()
        .copied()
        .filter(|&to| is_allowed(from, to, role))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::edges;
    use Status::*;

    #[test]
    fn non_edges_are_denied_for_every_role() {
        for from in Status::ALL {
            for to in Status::ALL {
                if is_edge(from, to) {
                    continue;
                }
                for role in Role::ALL {
                    assert_eq!(
                        authorize(from, to, role),
                        Err(DenialReason::InvalidTransition { from, to }),
                        "{from} -> {to} as {role}"
                    );
                }
            }
        }
    }

    #[test]
    fn privileged_destinations_are_gated_on_every_edge() {
        for (from, to) in edges() {
            for role in Role::ALL {
                let expected = !PRIVILEGED_TARGETS.contains(&to) || role.is_privileged();
                assert_eq!(is_allowed(from, to, role), expected, "{from} -> {to} as {role}");
            }
        }
    }

    #[test]
    fn role_denial_names_the_role_and_destination() {
        let denial = authorize(ForVoting, Approved, Role::Councilor).unwrap_err();
        assert_eq!(
            denial,
            DenialReason::RoleNotPermitted {
                role: Role::Councilor,
                to: Approved
            }
        );
        let message = denial.to_string();
        assert!(message.contains("councilor"), "{message}");
        assert!(message.contains("approved"), "{message}");
    }

    #[test]
    fn off_graph_requests_report_the_missing_edge_not_the_role() {
        // draft -> approved is not an edge; even for a councilor the denial
        // must be InvalidTransition, not RoleNotPermitted.
        let denial = authorize(Draft, Approved, Role::Councilor).unwrap_err();
        assert!(matches!(denial, DenialReason::InvalidTransition { .. }));
    }

    #[test]
    fn available_targets_is_the_authorized_slice_of_successors() {
        for from in Status::ALL {
            for role in Role::ALL {
                let targets = available_targets(from, role);
                for &to in successors_of(from) {
                    assert_eq!(
                        targets.contains(&to),
                        is_allowed(from, to, role),
                        "{from} -> {to} as {role}"
                    );
                }
                // Never invents a target that is not a successor.
                for to in &targets {
                    assert!(successors_of(from).contains(to));
                }
            }
        }
    }

    #[test]
    fn councilor_sees_no_targets_from_implemented() {
        // implemented's only successor is archived, which is privileged.
        assert_eq!(available_targets(Implemented, Role::Councilor), vec![]);
        assert_eq!(available_targets(Implemented, Role::Admin), vec![Archived]);
    }

    #[test]
    fn archived_offers_no_targets_to_anyone() {
        for role in Role::ALL {
            assert!(available_targets(Archived, role).is_empty());
        }
    }

    #[test]
    fn denial_reasons_serialize_with_a_type_tag() {
        let json = serde_json::to_value(DenialReason::InvalidTransition {
            from: Archived,
            to: Draft,
        })
        .unwrap();
        assert_eq!(json["type"], "InvalidTransition");
        assert_eq!(json["from"], "archived");
        assert_eq!(json["to"], "draft");
    }
}
