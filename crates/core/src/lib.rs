//! Blood Donor Finder Core - Shared domain types.
//!
//! This crate provides the types used across all Blood Donor Finder components:
//! - `web` - Server-rendered donor directory (axum)
//! - `cli` - Command-line tools for seeding and inspecting the directory
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no session handling. Role resolution and the remote document
//! store live in the `web` crate; everything here can be tested in isolation.
//!
//! # Modules
//!
//! - [`types`] - Newtypes for emails, phones, blood groups, roles, and donors
//! - [`filter`] - The pure directory filter (blood group + free-text search)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod filter;
pub mod types;

pub use filter::{DirectoryFilter, GroupFilter, filter_donors};
pub use types::*;
