//! Session middleware configuration.
//!
//! Sessions live in process memory: the directory cache and tokens are
//! per-browser state that is rebuilt from the store after a restart. The
//! moka-backed store drops each record once its expiry date passes, so
//! sessions that never sign out do not accumulate.

use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_moka_store::MokaStore;

use crate::config::WebConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "donor_session";

/// Session expiry time in seconds (24 hours of inactivity).
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

/// Upper bound on live sessions; the least recently used are evicted first.
const MAX_SESSIONS: u64 = 10_000;

fn create_session_store() -> MokaStore {
    MokaStore::new(Some(MAX_SESSIONS))
}

/// Create the session layer with an in-memory, self-expiring store.
#[must_use]
pub fn create_session_layer(config: &WebConfig) -> SessionManagerLayer<MokaStore> {
    SessionManagerLayer::new(create_session_store())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use tower_sessions::SessionStore;
    use tower_sessions::cookie::time::{Duration, OffsetDateTime};
    use tower_sessions::session::{Id, Record};

    use super::*;
    use crate::models::session_keys;

    fn record(expires_in: Duration) -> Record {
        let mut data = HashMap::new();
        data.insert(session_keys::CONTEXT.to_string(), serde_json::json!({"role": "admin"}));
        Record {
            id: Id::default(),
            data,
            expiry_date: OffsetDateTime::now_utc() + expires_in,
        }
    }

    #[tokio::test]
    async fn test_live_session_is_kept() {
        let store = create_session_store();
        let mut live = record(Duration::hours(1));
        store.create(&mut live).await.unwrap();

        let loaded = store.load(&live.id).await.unwrap().unwrap();
        assert_eq!(loaded.data, live.data);
    }

    #[tokio::test]
    async fn test_abandoned_session_is_dropped_after_expiry() {
        let store = create_session_store();
        let mut abandoned = record(Duration::milliseconds(200));
        store.create(&mut abandoned).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_secs(1)).await;

        assert!(store.load(&abandoned.id).await.unwrap().is_none());
    }
}
