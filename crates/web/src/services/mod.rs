//! Services: remote backends and the directory logic built on them.
//!
//! - [`identity`] - Sign-in boundary (Firebase Authentication or in-memory)
//! - [`store`] - Document store boundary (Cloud Firestore or in-memory)
//! - [`roles`] - Role registry lookup after sign-in
//! - [`directory`] - Donor cache loading and role-gated mutations
//! - [`fixture`] - YAML fixtures for the memory backend and the CLI

pub mod directory;
pub mod fixture;
pub mod identity;
pub mod roles;
pub mod store;

pub use directory::{DeleteOutcome, DirectoryError, DirectoryService, DonorForm};
pub use identity::{Identity, IdentityError, IdentityProvider};
pub use roles::RoleResolver;
pub use store::{DocumentStore, StoreError};
