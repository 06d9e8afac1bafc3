//! Strong type definitions for Warrant.
//!
//! Identifiers are newtypes so a group id can never be passed where a role
//! id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Create from a raw database id.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the raw id.
            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a [`User`].
    UserId,
    "UserId"
);
numeric_id!(
    /// Identifier of a [`Group`].
    GroupId,
    "GroupId"
);
numeric_id!(
    /// Identifier of a [`Role`].
    RoleId,
    "RoleId"
);

/// A named permission.
///
/// The name is the identity; descriptions are informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub name: String,
    pub description: Option<String>,
}

impl Permission {
    /// Create a permission without a description.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A principal that can log in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    /// Unique login name.
    pub username: String,

    /// Stored password in `{ALGO}hexdigest` form.
    ///
    /// See [`crate::password::PasswordHash`].
    pub password: String,

    /// Inactive users cannot log in or renew sessions.
    pub active: bool,
}

/// A named collection of roles and permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

/// A named collection of permissions. Roles do not nest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}
