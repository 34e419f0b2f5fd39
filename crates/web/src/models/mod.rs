//! Session-stored models.

pub mod session;

pub use session::{DirectoryCache, Flash, FlashKind, SessionContext, keys as session_keys};
