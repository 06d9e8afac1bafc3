//! # Warrant Core
//!
//! Pure primitives for Warrant: the RBAC grant graph, permission resolution,
//! the permission bitmap codec, password hashes and session identifiers.
//!
//! This crate contains no I/O and no storage. Everything here is a pure
//! function of its inputs plus, for id generation, the thread RNG.
//!
//! ## Key Types
//!
//! - [`GrantEdge`] / [`MembershipEdge`] - Edges of the grant graph
//! - [`SubjectGrants`] - Everything needed to resolve one subject
//! - [`PermissionBitmap`] - A versioned snapshot of permission names
//! - [`PermissionBits`] - A permission set encoded against one snapshot
//! - [`Session`] - A persisted login
//!
//! ## Resolution
//!
//! Edges are linearized into priority order and folded: `allowed` adds a
//! permission, `denied` removes it, the last edge wins. See [`resolve`].

pub mod bitmap;
pub mod error;
pub mod grant;
pub mod password;
pub mod resolve;
pub mod session;
pub mod types;

pub use bitmap::{PermissionBitmap, PermissionBits};
pub use error::{CoreError, Result};
pub use grant::{GrantEdge, GrantMode, MembershipEdge, Subject, Target};
pub use password::{PasswordAlgorithm, PasswordHash};
pub use resolve::{fold, linearize, GrantOp, GroupGrants, PermissionSet, RoleGrants, SubjectGrants};
pub use session::{generate_secret, Session, SessionId};
pub use types::{Group, GroupId, Permission, Role, RoleId, User, UserId};
