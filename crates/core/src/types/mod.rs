//! Core types for Blood Donor Finder.
//!
//! This module provides type-safe wrappers for the directory's domain concepts.

pub mod blood_group;
pub mod donor;
pub mod email;
pub mod id;
pub mod phone;
pub mod role;

pub use blood_group::{BloodGroup, BloodGroupError};
pub use donor::{Donor, DonorError, LastDonated, NewDonor, latest_last_donated};
pub use email::{Email, EmailError};
pub use id::{DonorId, IdError};
pub use phone::{Phone, PhoneError};
pub use role::Role;
