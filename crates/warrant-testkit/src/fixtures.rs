//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use warrant::{IssuerConfig, SessionIssuer};
use warrant_core::{
    GrantEdge, Group, MembershipEdge, PasswordAlgorithm, PasswordHash, Permission,
    PermissionBitmap, Role, Session, SessionId, Subject, Target, User, UserId,
};
use warrant_keys::KeyMaterial;
use warrant_store::{InsertResult, MemoryStore, Result, Store};

use crate::vectors::PLAIN_PEM;

/// Password of every seeded user.
pub const PASSWORD: &str = "correct horse";

/// Stored form of [`PASSWORD`] under `algorithm`.
pub fn stored_password(algorithm: PasswordAlgorithm) -> String {
    PasswordHash::compute(algorithm, PASSWORD).to_string()
}

/// Key material for [`crate::vectors::PLAIN_PEM`].
pub fn signing_keys() -> KeyMaterial {
    KeyMaterial::from_private_pem(PLAIN_PEM, None).expect("fixture key parses")
}

/// A test fixture with a store and signing keys.
pub struct TestFixture<S: Store = MemoryStore> {
    pub store: Arc<S>,
    pub keys: Arc<KeyMaterial>,
}

impl TestFixture<MemoryStore> {
    /// Create a fixture over an empty memory store.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }
}

impl Default for TestFixture<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Store> TestFixture<S> {
    /// Create a fixture over the given store.
    pub fn with_store(store: S) -> Self {
        Self {
            store: Arc::new(store),
            keys: Arc::new(signing_keys()),
        }
    }

    /// Build an issuer over this fixture's store and keys.
    pub fn issuer(&self, config: IssuerConfig) -> SessionIssuer<S> {
        SessionIssuer::new(self.store.clone(), self.keys.clone(), config)
            .expect("fixture keys can sign")
    }

    /// Create an active user whose password is [`PASSWORD`] (SHA1).
    pub async fn user(&self, name: &str) -> Result<User> {
        self.store
            .insert_user(name, &stored_password(PasswordAlgorithm::Sha1), true)
            .await
    }

    /// Create permissions, ignoring ones that already exist.
    pub async fn permissions(&self, names: &[&str]) -> Result<()> {
        for name in names {
            self.store.insert_permission(&Permission::new(*name)).await?;
        }
        Ok(())
    }

    /// Seed the newsroom graph described on [`Newsroom`].
    pub async fn seed_newsroom(&self) -> Result<Newsroom> {
        let store = &self.store;
        self.permissions(&Newsroom::PERMISSIONS).await?;

        let reader = store.insert_role("reader").await?;
        let editor = store.insert_role("editor").await?;
        let moderator = store.insert_role("moderator").await?;
        store.add_grant(&GrantEdge::allow(reader.id, "articles.read", 0)).await?;
        store.add_grant(&GrantEdge::allow(editor.id, "articles.write", 0)).await?;
        store.add_grant(&GrantEdge::allow(editor.id, "articles.publish", 1)).await?;
        store.add_grant(&GrantEdge::allow(moderator.id, "comments.moderate", 0)).await?;

        let staff = store.insert_group("staff").await?;
        let interns = store.insert_group("interns").await?;
        member(store.as_ref(), staff.id, Target::Role(reader.id), 0).await?;
        member(store.as_ref(), staff.id, Target::Role(editor.id), 1).await?;
        store.add_grant(&GrantEdge::deny(staff.id, "articles.publish", 0)).await?;
        member(store.as_ref(), interns.id, Target::Role(reader.id), 0).await?;
        store.add_grant(&GrantEdge::deny(interns.id, "articles.write", 0)).await?;

        let alice = self.user("alice").await?;
        member(store.as_ref(), alice.id, Target::Group(staff.id), 0).await?;
        member(store.as_ref(), alice.id, Target::Role(moderator.id), 0).await?;
        store.add_grant(&GrantEdge::allow(alice.id, "articles.publish", 0)).await?;

        let bob = self.user("bob").await?;
        member(store.as_ref(), bob.id, Target::Group(staff.id), 0).await?;
        member(store.as_ref(), bob.id, Target::Group(interns.id), 1).await?;

        let carol = store
            .insert_user("carol", &stored_password(PasswordAlgorithm::Md5), false)
            .await?;
        member(store.as_ref(), carol.id, Target::Group(staff.id), 0).await?;

        let dave = store
            .insert_user("dave", &stored_password(PasswordAlgorithm::Sha256), true)
            .await?;

        Ok(Newsroom {
            staff,
            interns,
            reader,
            editor,
            moderator,
            alice,
            bob,
            carol,
            dave,
        })
    }
}

async fn member<S: Store + ?Sized>(
    store: &S,
    subject: impl Into<Subject>,
    target: Target,
    prio: i64,
) -> Result<()> {
    let edge = MembershipEdge::new(subject, target, prio)
        .map_err(|e| warrant_store::StoreError::InvalidData(e.to_string()))?;
    store.add_membership(&edge).await
}

/// A small grant graph with known effective permissions.
///
/// - `staff` holds roles `reader` (prio 0) and `editor` (prio 1), then
///   denies `articles.publish`.
/// - `interns` holds `reader` and denies `articles.write`.
/// - `alice`: staff, plus role `moderator` and a direct allow of
///   `articles.publish`.
/// - `bob`: staff (prio 0) then interns (prio 1).
/// - `carol`: staff, inactive, MD5 password.
/// - `dave`: no edges, SHA256 password.
#[derive(Debug, Clone)]
pub struct Newsroom {
    pub staff: Group,
    pub interns: Group,
    pub reader: Role,
    pub editor: Role,
    pub moderator: Role,
    pub alice: User,
    pub bob: User,
    pub carol: User,
    pub dave: User,
}

impl Newsroom {
    pub const PERMISSIONS: [&'static str; 5] = [
        "admin.users",
        "articles.publish",
        "articles.read",
        "articles.write",
        "comments.moderate",
    ];

    /// Sorted effective permissions of a seeded user.
    pub fn expected(&self, user: UserId) -> Vec<&'static str> {
        if user == self.alice.id {
            vec!["articles.publish", "articles.read", "articles.write", "comments.moderate"]
        } else if user == self.bob.id {
            vec!["articles.read"]
        } else if user == self.carol.id {
            vec!["articles.read", "articles.write"]
        } else {
            vec![]
        }
    }
}

/// Store wrapper that reports a version collision for the first `n`
/// bitmap inserts without writing anything. Everything else delegates.
pub struct CollidingStore<S> {
    inner: S,
    remaining: AtomicU32,
    attempts: AtomicU32,
}

impl<S: Store> CollidingStore<S> {
    pub fn new(inner: S, collisions: u32) -> Self {
        Self {
            inner,
            remaining: AtomicU32::new(collisions),
            attempts: AtomicU32::new(0),
        }
    }

    /// Number of `insert_bitmap` calls seen so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: Store> Store for CollidingStore<S> {
    async fn insert_user(&self, username: &str, password: &str, active: bool) -> Result<User> {
        self.inner.insert_user(username, password, active).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.inner.get_user_by_username(username).await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        self.inner.get_user(id).await
    }

    async fn insert_group(&self, name: &str) -> Result<Group> {
        self.inner.insert_group(name).await
    }

    async fn insert_role(&self, name: &str) -> Result<Role> {
        self.inner.insert_role(name).await
    }

    async fn insert_permission(&self, permission: &Permission) -> Result<InsertResult> {
        self.inner.insert_permission(permission).await
    }

    async fn delete_permission(&self, name: &str) -> Result<bool> {
        self.inner.delete_permission(name).await
    }

    async fn list_permission_names(&self) -> Result<Vec<String>> {
        self.inner.list_permission_names().await
    }

    async fn add_grant(&self, edge: &GrantEdge) -> Result<()> {
        self.inner.add_grant(edge).await
    }

    async fn grants_for(&self, subject: Subject) -> Result<Vec<GrantEdge>> {
        self.inner.grants_for(subject).await
    }

    async fn add_membership(&self, edge: &MembershipEdge) -> Result<()> {
        self.inner.add_membership(edge).await
    }

    async fn memberships_for(&self, subject: Subject) -> Result<Vec<MembershipEdge>> {
        self.inner.memberships_for(subject).await
    }

    async fn insert_bitmap(&self, bitmap: &PermissionBitmap) -> Result<InsertResult> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let collide = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if collide {
            return Ok(InsertResult::AlreadyExists);
        }
        self.inner.insert_bitmap(bitmap).await
    }

    async fn get_bitmap(&self, version: &str) -> Result<Option<PermissionBitmap>> {
        self.inner.get_bitmap(version).await
    }

    async fn latest_bitmap(&self) -> Result<Option<PermissionBitmap>> {
        self.inner.latest_bitmap().await
    }

    async fn insert_session(&self, session: &Session) -> Result<()> {
        self.inner.insert_session(session).await
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>> {
        self.inner.get_session(id).await
    }
}
