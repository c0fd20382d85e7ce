//! Request identities and the closed role set recognized by the gateway.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Roles the gateway recognizes. The set is closed: anything else carried by
/// a credential is rejected at the boundary, never defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Clinician,
    Researcher,
    Auditor,
}

impl Role {
    /// Every recognized role, in a stable order.
    pub const ALL: [Role; 4] = [Role::Admin, Role::Clinician, Role::Researcher, Role::Auditor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Clinician => "clinician",
            Role::Researcher => "researcher",
            Role::Auditor => "auditor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a role string falls outside the closed set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unrecognized role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "clinician" => Ok(Role::Clinician),
            "researcher" => Ok(Role::Researcher),
            "auditor" => Ok(Role::Auditor),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Verified subject/role pair derived from a credential. An identity exists
/// only for the duration of the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject: String,
    pub role: Role,
}

impl Identity {
    pub fn new(subject: impl Into<String>, role: Role) -> Self {
        Self { subject: subject.into(), role }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_round_trip_through_strings() {
        for role in Role::ALL {
            let parsed: Role = role.as_str().parse().expect("parse role");
            assert_eq!(parsed, role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = "superuser".parse::<Role>().expect_err("role outside the closed set");
        assert_eq!(err, UnknownRole("superuser".to_string()));
    }

    #[test]
    fn role_parsing_is_case_sensitive() {
        assert!("Admin".parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Clinician).expect("serialize role");
        assert_eq!(json, "\"clinician\"");
    }
}
