//! Store trait: the abstract interface for RBAC and session persistence.
//!
//! This trait keeps the issuer storage-agnostic. Implementations include
//! SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use warrant_core::{
    Group, GrantEdge, MembershipEdge, Permission, PermissionBitmap, Role, Session, SessionId,
    Subject, User, UserId,
};

use crate::error::Result;

/// Result of inserting a row with a caller-chosen key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// Row was inserted.
    Inserted,
    /// A row with this key already exists; nothing was written.
    AlreadyExists,
}

/// The Store trait: async interface for persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - **Edges are unordered**: edge lists come back in insertion order; callers
///   sort by `prio` themselves.
/// - **Bitmaps are append-only**: there is no update or delete.
/// - **Sessions are write-once**: renewal inserts a new row.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Principals
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a user. `password` is the stored `{ALGO}hex` form.
    ///
    /// Fails with `Duplicate` if the username is taken.
    async fn insert_user(&self, username: &str, password: &str, active: bool) -> Result<User>;

    /// Look up a user by exact username.
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Look up a user by id.
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Create a group. Fails with `Duplicate` if the name is taken.
    async fn insert_group(&self, name: &str) -> Result<Group>;

    /// Create a role. Fails with `Duplicate` if the name is taken.
    async fn insert_role(&self, name: &str) -> Result<Role>;

    // ─────────────────────────────────────────────────────────────────────────
    // Permissions
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a permission.
    async fn insert_permission(&self, permission: &Permission) -> Result<InsertResult>;

    /// Delete a permission and every grant edge naming it.
    ///
    /// Returns `false` if no such permission existed.
    async fn delete_permission(&self, name: &str) -> Result<bool>;

    /// All permission names, sorted ascending.
    async fn list_permission_names(&self) -> Result<Vec<String>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Edges
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a grant edge. The permission must exist.
    async fn add_grant(&self, edge: &GrantEdge) -> Result<()>;

    /// Grant edges held directly by `subject`.
    async fn grants_for(&self, subject: Subject) -> Result<Vec<GrantEdge>>;

    /// Add a membership edge. Forbidden shapes fail with `InvalidData`.
    async fn add_membership(&self, edge: &MembershipEdge) -> Result<()>;

    /// Membership edges held by `subject`.
    async fn memberships_for(&self, subject: Subject) -> Result<Vec<MembershipEdge>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Permission Bitmaps
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a bitmap version.
    ///
    /// Returns `AlreadyExists` if the version id is taken; the caller retries
    /// with a fresh id.
    async fn insert_bitmap(&self, bitmap: &PermissionBitmap) -> Result<InsertResult>;

    /// Look up a bitmap by version id.
    async fn get_bitmap(&self, version: &str) -> Result<Option<PermissionBitmap>>;

    /// The most recently created bitmap (ties go to the last inserted).
    async fn latest_bitmap(&self) -> Result<Option<PermissionBitmap>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Sessions
    // ─────────────────────────────────────────────────────────────────────────

    /// Persist a new session. Fails with `Duplicate` if the id is taken.
    async fn insert_session(&self, session: &Session) -> Result<()>;

    /// Look up a session by id.
    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>>;
}
