//! Authentication identity.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Instructor,
}

impl Role {
    /// Role assumed for an authenticated user whose payload names none.
    pub const BASELINE: Role = Role::Student;

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Instructor => "instructor",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Role::Student),
            "instructor" => Some(Role::Instructor),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is using the workspace.
///
/// A role exists exactly when the user is signed in, so the two invalid
/// combinations of the flat `{authenticated, role}` record are unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    #[default]
    SignedOut,
    SignedIn {
        username: Option<String>,
        role: Role,
    },
}

impl Identity {
    #[must_use]
    pub fn signed_in(username: impl Into<String>, role: Role) -> Self {
        Identity::SignedIn {
            username: Some(username.into()),
            role,
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Identity::SignedIn { .. })
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        match self {
            Identity::SignedOut => None,
            Identity::SignedIn { username, .. } => username.as_deref(),
        }
    }

    #[must_use]
    pub const fn role(&self) -> Option<Role> {
        match self {
            Identity::SignedOut => None,
            Identity::SignedIn { role, .. } => Some(*role),
        }
    }
}

/// Raw body of the identity lookup. Every field is optional on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct IdentityPayload {
    #[serde(default)]
    pub authenticated: Option<bool>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}
