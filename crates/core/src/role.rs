//! Actor roles and the actors that carry them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role an actor holds when requesting a transition. Roles form no
/// hierarchy; the only distinction the authorizer draws is privileged
/// (`super_admin`, `admin`) versus everyone else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Staff,
    Councilor,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::SuperAdmin, Role::Admin, Role::Staff, Role::Councilor];

    /// Whether this role may move documents into privileged destinations.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Councilor => "councilor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a string that names no known role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}'", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .find(|role| role.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// The identity behind a transition request: who is acting, and as what.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Actor {
            id: id.into(),
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_two_roles_are_privileged() {
        let privileged: Vec<Role> = Role::ALL.into_iter().filter(Role::is_privileged).collect();
        assert_eq!(privileged, vec![Role::SuperAdmin, Role::Admin]);
    }

    #[test]
    fn role_round_trips_through_its_name() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("mayor".parse::<Role>().is_err());
    }

    #[test]
    fn actor_serde_shape() {
        let actor = Actor::new("clerk-7", Role::Staff);
        let json = serde_json::to_value(&actor).unwrap();
        assert_eq!(json, serde_json::json!({"id": "clerk-7", "role": "staff"}));
    }
}
