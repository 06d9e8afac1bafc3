//! # Warrant Store
//!
//! Storage abstraction for Warrant. Provides a trait-based interface for the
//! RBAC graph, the permission bitmap log and sessions, with SQLite and
//! in-memory implementations.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`InsertResult`] - Result of inserting a keyed row
//!
//! ## Usage
//!
//! ```rust,no_run
//! use warrant_store::{SqliteStore, Store};
//! use warrant_core::Permission;
//!
//! async fn example() -> warrant_store::Result<()> {
//!     let store = SqliteStore::open("warrant.db")?;
//!     store.insert_permission(&Permission::new("articles.read")).await?;
//!     let names = store.list_permission_names().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Cascading deletes**: deleting a permission removes grant edges naming it
//! - **Shape checks**: memberships other than user→group, user→role and
//!   group→role are rejected as invalid data
//! - **Collision reporting**: a taken bitmap version returns `AlreadyExists`

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{InsertResult, Store};
