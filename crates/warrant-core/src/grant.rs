//! Grant and membership edges of the RBAC graph.
//!
//! A grant edge allows or denies one permission to one subject. A membership
//! edge makes a subject inherit from a group or role. Both carry a `prio`
//! that fixes the order in which they are applied.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::types::{GroupId, RoleId, UserId};

/// Whether a grant edge adds or removes its permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantMode {
    Allowed,
    Denied,
}

impl GrantMode {
    /// Storage representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            GrantMode::Allowed => "allowed",
            GrantMode::Denied => "denied",
        }
    }
}

impl fmt::Display for GrantMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrantMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allowed" => Ok(GrantMode::Allowed),
            "denied" => Ok(GrantMode::Denied),
            other => Err(CoreError::UnknownGrantMode(other.to_string())),
        }
    }
}

/// The holder of a grant or membership edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Subject {
    User(UserId),
    Group(GroupId),
    Role(RoleId),
}

impl Subject {
    /// Storage discriminator.
    pub const fn kind(&self) -> &'static str {
        match self {
            Subject::User(_) => "user",
            Subject::Group(_) => "group",
            Subject::Role(_) => "role",
        }
    }

    /// Raw id, without the kind.
    pub const fn raw_id(&self) -> i64 {
        match self {
            Subject::User(id) => id.0,
            Subject::Group(id) => id.0,
            Subject::Role(id) => id.0,
        }
    }

    /// Rebuild from the storage discriminator and raw id.
    pub fn from_parts(kind: &str, id: i64) -> Option<Self> {
        match kind {
            "user" => Some(Subject::User(UserId(id))),
            "group" => Some(Subject::Group(GroupId(id))),
            "role" => Some(Subject::Role(RoleId(id))),
            _ => None,
        }
    }
}

impl From<UserId> for Subject {
    fn from(id: UserId) -> Self {
        Subject::User(id)
    }
}

impl From<GroupId> for Subject {
    fn from(id: GroupId) -> Self {
        Subject::Group(id)
    }
}

impl From<RoleId> for Subject {
    fn from(id: RoleId) -> Self {
        Subject::Role(id)
    }
}

/// What a membership edge points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Target {
    Group(GroupId),
    Role(RoleId),
}

impl Target {
    /// Storage discriminator.
    pub const fn kind(&self) -> &'static str {
        match self {
            Target::Group(_) => "group",
            Target::Role(_) => "role",
        }
    }

    /// Raw id, without the kind.
    pub const fn raw_id(&self) -> i64 {
        match self {
            Target::Group(id) => id.0,
            Target::Role(id) => id.0,
        }
    }

    /// Rebuild from the storage discriminator and raw id.
    pub fn from_parts(kind: &str, id: i64) -> Option<Self> {
        match kind {
            "group" => Some(Target::Group(GroupId(id))),
            "role" => Some(Target::Role(RoleId(id))),
            _ => None,
        }
    }
}

/// A single allow/deny of one permission for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantEdge {
    pub subject: Subject,
    pub permission: String,
    pub mode: GrantMode,
    pub prio: i64,
}

impl GrantEdge {
    /// An `allowed` edge.
    pub fn allow(subject: impl Into<Subject>, permission: impl Into<String>, prio: i64) -> Self {
        Self {
            subject: subject.into(),
            permission: permission.into(),
            mode: GrantMode::Allowed,
            prio,
        }
    }

    /// A `denied` edge.
    pub fn deny(subject: impl Into<Subject>, permission: impl Into<String>, prio: i64) -> Self {
        Self {
            subject: subject.into(),
            permission: permission.into(),
            mode: GrantMode::Denied,
            prio,
        }
    }
}

/// Inheritance of a subject from a group or role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MembershipEdge {
    pub subject: Subject,
    pub target: Target,
    pub prio: i64,
}

impl MembershipEdge {
    /// Create a membership edge, rejecting shapes the RBAC model forbids.
    ///
    /// Valid shapes are user→group, user→role and group→role.
    pub fn new(
        subject: impl Into<Subject>,
        target: Target,
        prio: i64,
    ) -> Result<Self, CoreError> {
        let subject = subject.into();
        Self::check_shape(&subject, &target)?;
        Ok(Self {
            subject,
            target,
            prio,
        })
    }

    /// Check that `subject` may hold a membership in `target`.
    pub fn check_shape(subject: &Subject, target: &Target) -> Result<(), CoreError> {
        match (subject, target) {
            (Subject::User(_), _) => Ok(()),
            (Subject::Group(_), Target::Role(_)) => Ok(()),
            (Subject::Group(g), Target::Group(t)) => Err(CoreError::InvalidMembership(format!(
                "group {} cannot be a member of group {}",
                g, t
            ))),
            (Subject::Role(r), _) => Err(CoreError::InvalidMembership(format!(
                "role {} cannot hold memberships",
                r
            ))),
        }
    }
}
