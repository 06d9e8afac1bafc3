//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use warrant_core::{
    GrantEdge, GrantMode, Group, GroupId, MembershipEdge, Permission, PermissionBitmap, Role,
    RoleId, Session, SessionId, Subject, Target, User, UserId,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{InsertResult, Store};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "opened sqlite store");
        Self::init(conn)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        migration::migrate(&mut conn, now_millis())?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Unavailable(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("spawn_blocking failed: {}", e)))?
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

fn exists(conn: &Connection, sql: &str, key: &dyn rusqlite::ToSql) -> Result<bool> {
    Ok(conn.query_row(sql, [key], |row| row.get(0))?)
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(row.get("id")?),
        username: row.get("username")?,
        password: row.get("password")?,
        active: row.get("active")?,
    })
}

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: SessionId(row.get("id")?),
        username: row.get("username")?,
        issued_at: row.get("issued_at")?,
        expires_at: row.get("expires_at")?,
        secret: row.get("secret")?,
    })
}

fn row_to_bitmap(row: &rusqlite::Row<'_>) -> rusqlite::Result<PermissionBitmap> {
    Ok(PermissionBitmap {
        version: row.get("version")?,
        permissions: row.get("permissions")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_subject(kind: &str, id: i64) -> Result<Subject> {
    Subject::from_parts(kind, id)
        .ok_or_else(|| StoreError::InvalidData(format!("unknown subject kind {:?}", kind)))
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_user(&self, username: &str, password: &str, active: bool) -> Result<User> {
        let username = username.to_string();
        let password = password.to_string();

        self.run(move |conn| {
            let tx = conn.transaction()?;
            if exists(
                &tx,
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
                &username,
            )? {
                return Err(StoreError::Duplicate(format!("username {:?}", username)));
            }

            tx.execute(
                "INSERT INTO users (username, password, active) VALUES (?1, ?2, ?3)",
                params![username, password, active],
            )?;
            let id = UserId(tx.last_insert_rowid());
            tx.commit()?;

            Ok(User {
                id,
                username,
                password,
                active,
            })
        })
        .await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let username = username.to_string();
        self.run(move |conn| {
            conn.query_row(
                "SELECT id, username, password, active FROM users WHERE username = ?1",
                params![username],
                row_to_user,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        self.run(move |conn| {
            conn.query_row(
                "SELECT id, username, password, active FROM users WHERE id = ?1",
                params![id.get()],
                row_to_user,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn insert_group(&self, name: &str) -> Result<Group> {
        let name = name.to_string();
        self.run(move |conn| {
            if exists(
                conn,
                "SELECT EXISTS(SELECT 1 FROM rbac_groups WHERE name = ?1)",
                &name,
            )? {
                return Err(StoreError::Duplicate(format!("group {:?}", name)));
            }
            conn.execute("INSERT INTO rbac_groups (name) VALUES (?1)", params![name])?;
            Ok(Group {
                id: GroupId(conn.last_insert_rowid()),
                name,
            })
        })
        .await
    }

    async fn insert_role(&self, name: &str) -> Result<Role> {
        let name = name.to_string();
        self.run(move |conn| {
            if exists(
                conn,
                "SELECT EXISTS(SELECT 1 FROM rbac_roles WHERE name = ?1)",
                &name,
            )? {
                return Err(StoreError::Duplicate(format!("role {:?}", name)));
            }
            conn.execute("INSERT INTO rbac_roles (name) VALUES (?1)", params![name])?;
            Ok(Role {
                id: RoleId(conn.last_insert_rowid()),
                name,
            })
        })
        .await
    }

    async fn insert_permission(&self, permission: &Permission) -> Result<InsertResult> {
        let permission = permission.clone();
        self.run(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO permissions (name, description) VALUES (?1, ?2)",
                params![permission.name, permission.description],
            )?;
            Ok(if changed == 0 {
                InsertResult::AlreadyExists
            } else {
                InsertResult::Inserted
            })
        })
        .await
    }

    async fn delete_permission(&self, name: &str) -> Result<bool> {
        let name = name.to_string();
        self.run(move |conn| {
            // grant_edges rows go with it via ON DELETE CASCADE
            let deleted = conn.execute("DELETE FROM permissions WHERE name = ?1", params![name])?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn list_permission_names(&self) -> Result<Vec<String>> {
        self.run(|conn| {
            let mut stmt = conn.prepare("SELECT name FROM permissions ORDER BY name")?;
            let names = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(names)
        })
        .await
    }

    async fn add_grant(&self, edge: &GrantEdge) -> Result<()> {
        let edge = edge.clone();
        self.run(move |conn| {
            if !exists(
                conn,
                "SELECT EXISTS(SELECT 1 FROM permissions WHERE name = ?1)",
                &edge.permission,
            )? {
                return Err(StoreError::NotFound(format!("permission {:?}", edge.permission)));
            }
            conn.execute(
                "INSERT INTO grant_edges (subject_kind, subject_id, permission, mode, prio)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    edge.subject.kind(),
                    edge.subject.raw_id(),
                    edge.permission,
                    edge.mode.as_str(),
                    edge.prio,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn grants_for(&self, subject: Subject) -> Result<Vec<GrantEdge>> {
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT permission, mode, prio FROM grant_edges
                 WHERE subject_kind = ?1 AND subject_id = ?2
                 ORDER BY rowid",
            )?;
            let rows = stmt
                .query_map(params![subject.kind(), subject.raw_id()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter()
                .map(|(permission, mode, prio)| {
                    let mode: GrantMode = mode.parse().map_err(|e: warrant_core::CoreError| {
                        StoreError::InvalidData(format!("grant on {:?}: {}", permission, e))
                    })?;
                    Ok(GrantEdge {
                        subject,
                        permission,
                        mode,
                        prio,
                    })
                })
                .collect()
        })
        .await
    }

    async fn add_membership(&self, edge: &MembershipEdge) -> Result<()> {
        MembershipEdge::check_shape(&edge.subject, &edge.target)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;

        let edge = edge.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO membership_edges (subject_kind, subject_id, target_kind, target_id, prio)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    edge.subject.kind(),
                    edge.subject.raw_id(),
                    edge.target.kind(),
                    edge.target.raw_id(),
                    edge.prio,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn memberships_for(&self, subject: Subject) -> Result<Vec<MembershipEdge>> {
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT subject_kind, subject_id, target_kind, target_id, prio FROM membership_edges
                 WHERE subject_kind = ?1 AND subject_id = ?2
                 ORDER BY rowid",
            )?;
            let rows = stmt
                .query_map(params![subject.kind(), subject.raw_id()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter()
                .map(|(subject_kind, subject_id, target_kind, target_id, prio)| {
                    let subject = parse_subject(&subject_kind, subject_id)?;
                    let target = Target::from_parts(&target_kind, target_id).ok_or_else(|| {
                        StoreError::InvalidData(format!("unknown target kind {:?}", target_kind))
                    })?;
                    MembershipEdge::new(subject, target, prio)
                        .map_err(|e| StoreError::InvalidData(e.to_string()))
                })
                .collect()
        })
        .await
    }

    async fn insert_bitmap(&self, bitmap: &PermissionBitmap) -> Result<InsertResult> {
        let bitmap = bitmap.clone();
        self.run(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO permission_bitmaps (version, permissions, created_at)
                 VALUES (?1, ?2, ?3)",
                params![bitmap.version, bitmap.permissions, bitmap.created_at],
            )?;
            Ok(if changed == 0 {
                InsertResult::AlreadyExists
            } else {
                InsertResult::Inserted
            })
        })
        .await
    }

    async fn get_bitmap(&self, version: &str) -> Result<Option<PermissionBitmap>> {
        let version = version.to_string();
        self.run(move |conn| {
            conn.query_row(
                "SELECT version, permissions, created_at FROM permission_bitmaps WHERE version = ?1",
                params![version],
                row_to_bitmap,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn latest_bitmap(&self) -> Result<Option<PermissionBitmap>> {
        self.run(|conn| {
            conn.query_row(
                "SELECT version, permissions, created_at FROM permission_bitmaps
                 ORDER BY created_at DESC, seq DESC LIMIT 1",
                [],
                row_to_bitmap,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn insert_session(&self, session: &Session) -> Result<()> {
        let session = session.clone();
        self.run(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO sessions (id, username, issued_at, expires_at, secret)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    session.id.as_str(),
                    session.username,
                    session.issued_at,
                    session.expires_at,
                    session.secret,
                ],
            )?;
            if changed == 0 {
                return Err(StoreError::Duplicate(format!("session {}", session.id)));
            }
            Ok(())
        })
        .await
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>> {
        let id = id.clone();
        self.run(move |conn| {
            conn.query_row(
                "SELECT id, username, issued_at, expires_at, secret FROM sessions WHERE id = ?1",
                params![id.as_str()],
                row_to_session,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }
}
