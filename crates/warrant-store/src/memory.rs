//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use warrant_core::{
    GrantEdge, Group, GroupId, MembershipEdge, Permission, PermissionBitmap, Role, RoleId,
    Session, SessionId, Subject, User, UserId,
};

use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    next_id: i64,

    users: BTreeMap<UserId, User>,
    groups: BTreeMap<GroupId, Group>,
    roles: BTreeMap<RoleId, Role>,

    /// Permissions by name (sorted).
    permissions: BTreeMap<String, Permission>,

    /// Edges in insertion order.
    grants: Vec<GrantEdge>,
    memberships: Vec<MembershipEdge>,

    /// Bitmap log in insertion order.
    bitmaps: Vec<PermissionBitmap>,

    sessions: HashMap<SessionId, Session>,
}

impl MemoryStoreInner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, username: &str, password: &str, active: bool) -> Result<User> {
        let mut inner = self.write()?;
        if inner.users.values().any(|u| u.username == username) {
            return Err(StoreError::Duplicate(format!("username {:?}", username)));
        }

        let user = User {
            id: UserId(inner.next_id()),
            username: username.to_string(),
            password: password.to_string(),
            active,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let inner = self.read()?;
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn insert_group(&self, name: &str) -> Result<Group> {
        let mut inner = self.write()?;
        if inner.groups.values().any(|g| g.name == name) {
            return Err(StoreError::Duplicate(format!("group {:?}", name)));
        }

        let group = Group {
            id: GroupId(inner.next_id()),
            name: name.to_string(),
        };
        inner.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn insert_role(&self, name: &str) -> Result<Role> {
        let mut inner = self.write()?;
        if inner.roles.values().any(|r| r.name == name) {
            return Err(StoreError::Duplicate(format!("role {:?}", name)));
        }

        let role = Role {
            id: RoleId(inner.next_id()),
            name: name.to_string(),
        };
        inner.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn insert_permission(&self, permission: &Permission) -> Result<InsertResult> {
        let mut inner = self.write()?;
        if inner.permissions.contains_key(&permission.name) {
            return Ok(InsertResult::AlreadyExists);
        }
        inner
            .permissions
            .insert(permission.name.clone(), permission.clone());
        Ok(InsertResult::Inserted)
    }

    async fn delete_permission(&self, name: &str) -> Result<bool> {
        let mut inner = self.write()?;
        if inner.permissions.remove(name).is_none() {
            return Ok(false);
        }
        inner.grants.retain(|g| g.permission != name);
        Ok(true)
    }

    async fn list_permission_names(&self) -> Result<Vec<String>> {
        Ok(self.read()?.permissions.keys().cloned().collect())
    }

    async fn add_grant(&self, edge: &GrantEdge) -> Result<()> {
        let mut inner = self.write()?;
        if !inner.permissions.contains_key(&edge.permission) {
            return Err(StoreError::NotFound(format!("permission {:?}", edge.permission)));
        }
        inner.grants.push(edge.clone());
        Ok(())
    }

    async fn grants_for(&self, subject: Subject) -> Result<Vec<GrantEdge>> {
        let inner = self.read()?;
        Ok(inner
            .grants
            .iter()
            .filter(|g| g.subject == subject)
            .cloned()
            .collect())
    }

    async fn add_membership(&self, edge: &MembershipEdge) -> Result<()> {
        MembershipEdge::check_shape(&edge.subject, &edge.target)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        self.write()?.memberships.push(edge.clone());
        Ok(())
    }

    async fn memberships_for(&self, subject: Subject) -> Result<Vec<MembershipEdge>> {
        let inner = self.read()?;
        Ok(inner
            .memberships
            .iter()
            .filter(|m| m.subject == subject)
            .cloned()
            .collect())
    }

    async fn insert_bitmap(&self, bitmap: &PermissionBitmap) -> Result<InsertResult> {
        let mut inner = self.write()?;
        if inner.bitmaps.iter().any(|b| b.version == bitmap.version) {
            return Ok(InsertResult::AlreadyExists);
        }
        inner.bitmaps.push(bitmap.clone());
        Ok(InsertResult::Inserted)
    }

    async fn get_bitmap(&self, version: &str) -> Result<Option<PermissionBitmap>> {
        let inner = self.read()?;
        Ok(inner.bitmaps.iter().find(|b| b.version == version).cloned())
    }

    async fn latest_bitmap(&self) -> Result<Option<PermissionBitmap>> {
        // max_by_key keeps the last of equal maxima, i.e. the latest insert
        let inner = self.read()?;
        Ok(inner.bitmaps.iter().max_by_key(|b| b.created_at).cloned())
    }

    async fn insert_session(&self, session: &Session) -> Result<()> {
        let mut inner = self.write()?;
        if inner.sessions.contains_key(&session.id) {
            return Err(StoreError::Duplicate(format!("session {}", session.id)));
        }
        inner.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>> {
        Ok(self.read()?.sessions.get(id).cloned())
    }
}
