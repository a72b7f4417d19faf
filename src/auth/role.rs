//! Workspace role hierarchy
//!
//! Roles form a fixed total order. Lower priority numbers are more
//! privileged: `admin` (0) outranks `editor` (1). Names outside the table
//! never parse, so an unknown stored or claimed role satisfies nothing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Privilege level of a caller inside one workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full control, including deletes and membership management
    Admin,
    /// Can read, create and update content
    Editor,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown workspace role: {0}")]
pub struct UnknownRole(pub String);

impl Role {
    pub const fn priority(self) -> u8 {
        match self {
            Role::Admin => 0,
            Role::Editor => 1,
        }
    }

    /// True iff this role is at least as privileged as `required`.
    pub const fn satisfies(self, required: Role) -> bool {
        self.priority() <= required.priority()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}
