//! Newtype IDs for remote documents.
//!
//! Document IDs are assigned by the document store and are opaque strings.
//! Use the `define_id!` macro to create wrappers that prevent mixing IDs of
//! different collections.

/// Errors that can occur when parsing a document ID.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input string is empty.
    #[error("document id cannot be empty")]
    Empty,
    /// The input would address a different document path.
    #[error("document id cannot contain '/'")]
    ContainsSlash,
    /// `.` and `..` are reserved by the store.
    #[error("document id cannot be '.' or '..'")]
    Reserved,
}

/// Macro to define a type-safe document ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - `parse()` validating the ID is a single path segment
/// - `as_str()` and `Display`
///
/// # Example
///
/// ```rust
/// # use donor_finder_core::define_id;
/// define_id!(DonorId);
/// define_id!(RoleRecordId);
///
/// let donor = DonorId::parse("x8Yq2").unwrap();
/// assert_eq!(donor.as_str(), "x8Yq2");
/// assert!(DonorId::parse("donors/other").is_err());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Parse an ID, rejecting values that are not a single path segment.
            ///
            /// # Errors
            ///
            /// Returns an error if the ID is empty, contains `/`, or is `.`/`..`.
            pub fn parse(id: &str) -> ::core::result::Result<Self, $crate::types::id::IdError> {
                if id.is_empty() {
                    return Err($crate::types::id::IdError::Empty);
                }
                if id.contains('/') {
                    return Err($crate::types::id::IdError::ContainsSlash);
                }
                if id == "." || id == ".." {
                    return Err($crate::types::id::IdError::Reserved);
                }
                Ok(Self(id.to_owned()))
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::types::id::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

define_id!(DonorId);
