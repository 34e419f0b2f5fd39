//! Integration tests against a real Firebase project.
//!
//! These tests require:
//! - `FIREBASE_API_KEY` and `FIREBASE_PROJECT_ID` for a test project
//! - `DONOR_FINDER_TEST_EMAIL` / `DONOR_FINDER_TEST_PASSWORD` for an account
//!   with a `super_admin` record in the `users` collection
//! - For the server test, a running server at `DONOR_FINDER_TEST_URL`
//!
//! Run with: cargo test -p donor-finder-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use reqwest::{Client, StatusCode, redirect::Policy};
use secrecy::SecretString;
use uuid::Uuid;

use donor_finder_core::{DonorId, Email, Role};
use donor_finder_web::config::WebConfig;
use donor_finder_web::models::SessionContext;
use donor_finder_web::services::{DeleteOutcome, DonorForm};
use donor_finder_web::state::AppState;

fn env(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} must be set for live tests"))
}

fn base_url() -> String {
    std::env::var("DONOR_FINDER_TEST_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string())
}

async fn signed_in_context() -> (AppState, SessionContext) {
    let state = AppState::from_config(WebConfig::from_env().unwrap()).unwrap();
    let email = Email::parse(&env("DONOR_FINDER_TEST_EMAIL")).unwrap();
    let password = SecretString::from(env("DONOR_FINDER_TEST_PASSWORD"));

    let identity = state.identity().sign_in(&email, &password).await.unwrap();
    let role = state.roles().resolve(&identity).await;
    (state, SessionContext::new(identity, role))
}

#[tokio::test]
#[ignore = "Requires a Firebase test project and credentials"]
async fn test_live_add_then_delete_round_trip() {
    let (state, mut ctx) = signed_in_context().await;
    assert_eq!(ctx.role, Role::SuperAdmin);

    let name = format!("Integration {}", Uuid::new_v4());
    let form = DonorForm {
        name: name.clone(),
        group: "AB-".to_string(),
        city: "Testville".to_string(),
        phone: "+911234567890".to_string(),
        last_donated: String::new(),
    };

    let id: DonorId = state
        .directory()
        .add(&mut ctx, &form, Utc::now())
        .await
        .unwrap()
        .unwrap();
    let added = ctx.cache.donors().iter().find(|d| d.id == id).unwrap();
    assert_eq!(added.name.as_deref(), Some(name.as_str()));
    assert_eq!(added.last_donated.to_string(), "N/A");

    let outcome = state.directory().delete(&mut ctx, &id, true).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert!(ctx.cache.donors().iter().all(|d| d.id != id));
}

#[tokio::test]
#[ignore = "Requires a Firebase test project and credentials"]
async fn test_live_token_refresh() {
    let (state, ctx) = signed_in_context().await;
    let refreshed = state.identity().refresh(&ctx.identity).await.unwrap();
    assert_eq!(refreshed.uid, ctx.identity.uid);
    assert!(refreshed.expires_at > Utc::now());
}

#[tokio::test]
#[ignore = "Requires a running server backed by a Firebase test project"]
async fn test_live_server_sign_in_and_list() {
    let client = Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .expect("Failed to create HTTP client");
    let base_url = base_url();

    let resp = client
        .post(format!("{base_url}/auth/login"))
        .form(&[
            ("email", env("DONOR_FINDER_TEST_EMAIL")),
            ("password", env("DONOR_FINDER_TEST_PASSWORD")),
        ])
        .send()
        .await
        .expect("Failed to sign in");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let resp = client
        .get(format!("{base_url}/donors"))
        .send()
        .await
        .expect("Failed to get donor list");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("SUPER_ADMIN"));
    assert!(body.contains("filter-chips"));
}
