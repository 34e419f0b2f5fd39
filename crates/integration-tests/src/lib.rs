//! Integration tests for Blood Donor Finder.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests against the memory backend
//! cargo test -p donor-finder-integration-tests
//!
//! # Live tests against a running server and Firebase project
//! cargo test -p donor-finder-integration-tests -- --ignored
//! ```
//!
//! The in-process tests drive the real router (sessions, middleware,
//! templates) with `tower::ServiceExt::oneshot` over in-memory backends, so
//! every remote call can be counted.

#![allow(clippy::missing_panics_doc)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use chrono::Utc;
use tower::ServiceExt;

use donor_finder_core::{NewDonor, Role};
use donor_finder_web::config::WebConfig;
use donor_finder_web::router;
use donor_finder_web::services::directory::donor_fields;
use donor_finder_web::services::identity::MemoryIdentityProvider;
use donor_finder_web::services::store::{DONORS, FieldValue, Fields, MemoryDocumentStore, USERS};
use donor_finder_web::state::AppState;

/// Password given to every test account.
pub const PASSWORD: &str = "correct-horse-battery";

/// An application wired to in-memory backends.
pub struct TestApp {
    pub router: Router,
    pub identity: Arc<MemoryIdentityProvider>,
    pub store: Arc<MemoryDocumentStore>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WebConfig::for_memory_backend())
    }

    #[must_use]
    pub fn with_config(config: WebConfig) -> Self {
        let identity = Arc::new(MemoryIdentityProvider::new());
        let store = Arc::new(MemoryDocumentStore::new());
        let state = AppState::new(config, identity.clone(), store.clone());
        Self {
            router: router(state),
            identity,
            store,
        }
    }

    /// Register an account, with a registry record when `role` is given.
    pub fn add_account(&self, email: &str, role: Option<&str>) {
        self.identity.add_account(email, PASSWORD);
        if let Some(role) = role {
            let mut fields = Fields::new();
            fields.insert("email".to_string(), FieldValue::from(email));
            fields.insert("role".to_string(), FieldValue::from(role));
            self.store.seed(USERS, fields);
        }
    }

    /// Register an account with a known role.
    pub fn add_account_with_role(&self, email: &str, role: Role) {
        self.add_account(email, Some(role.as_str()));
    }

    /// Store a donor directly, bypassing role checks. Returns its ID.
    pub fn seed_donor(&self, name: &str, group: &str, city: &str, phone: &str) -> String {
        let donor = NewDonor::new(name, group, city, phone, "", Utc::now())
            .expect("seed donor should be valid");
        self.store.seed(DONORS, donor_fields(&donor))
    }

    /// A client with an empty cookie jar.
    #[must_use]
    pub fn client(&self) -> TestClient {
        TestClient {
            router: self.router.clone(),
            cookie: None,
        }
    }

    /// A client signed in as `email`.
    pub async fn sign_in(&self, email: &str) -> TestClient {
        let mut client = self.client();
        let response = client
            .post_form("/auth/login", &[("email", email), ("password", PASSWORD)])
            .await;
        assert_eq!(
            response.status,
            StatusCode::SEE_OTHER,
            "sign-in failed: {}",
            response.body
        );
        assert_eq!(response.location(), Some("/donors"));
        client
    }
}

/// A browser-like client that keeps the session cookie.
pub struct TestClient {
    router: Router,
    cookie: Option<String>,
}

/// A buffered response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// Redirect target, if any.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}

impl TestClient {
    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.send(Method::GET, path, None).await
    }

    pub async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        self.send(Method::POST, path, Some(body)).await
    }

    /// Whether the client currently holds a session cookie.
    #[must_use]
    pub const fn has_session(&self) -> bool {
        self.cookie.is_some()
    }

    async fn send(&mut self, method: Method, path: &str, form: Option<String>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match form {
            Some(form) => {
                builder = builder.header(
                    header::CONTENT_TYPE,
                    "application/x-www-form-urlencoded",
                );
                Body::from(form)
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("valid request"))
            .await
            .expect("router is infallible");

        for set_cookie in response.headers().get_all(header::SET_COOKIE) {
            let Ok(value) = set_cookie.to_str() else {
                continue;
            };
            let pair = value.split(';').next().unwrap_or_default().trim();
            let removed = value.contains("Max-Age=0") || pair.ends_with('=');
            self.cookie = if removed { None } else { Some(pair.to_string()) };
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}
