//! # Warrant Testkit
//!
//! Testing utilities for Warrant.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: `EVP_BytesToKey` outputs and legacy-encrypted PEM keys
//!   that must match OpenSSL exactly
//! - **Generators**: Proptest strategies for grant graphs
//! - **Fixtures**: A seeded grant graph, signing keys and a collision-injecting store
//!
//! ## Golden Vectors
//!
//! ```rust
//! use warrant_testkit::vectors::verify_all_vectors;
//!
//! for (name, passed) in verify_all_vectors() {
//!     assert!(passed, "{}", name);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use warrant_testkit::generators::subject_grants;
//!
//! proptest! {
//!     #[test]
//!     fn resolves_within_universe((names, graph) in subject_grants()) {
//!         let resolved = warrant_core::resolve::resolve(&graph);
//!         prop_assert!(resolved.iter().all(|p| names.contains(p)));
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use warrant_testkit::fixtures::{TestFixture, PASSWORD};
//!
//! let fixture = TestFixture::new();
//! let newsroom = fixture.seed_newsroom().await?;
//! let issuer = fixture.issuer(Default::default());
//! let session = issuer.login("alice", PASSWORD, Default::default()).await?;
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{CollidingStore, Newsroom, TestFixture, PASSWORD};
pub use generators::subject_grants;
pub use vectors::{encrypted_pems, kdf_vectors, verify_all_vectors, EncryptedPem, KdfVector};
