//! End-to-end tests for the donor directory.
//!
//! Each test signs in through the login form and drives the directory pages
//! over in-memory backends, counting the remote calls that reach the store.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;

use donor_finder_core::Role;
use donor_finder_integration_tests::TestApp;
use donor_finder_web::services::directory::{ADD_FORBIDDEN, DELETE_FORBIDDEN};
use donor_finder_web::services::store::DONORS;

const USER: &str = "guest@example.org";
const ADMIN: &str = "admin@example.org";
const SUPER: &str = "root@example.org";

fn app() -> TestApp {
    let app = TestApp::new();
    app.add_account(USER, None);
    app.add_account_with_role(ADMIN, Role::Admin);
    app.add_account_with_role(SUPER, Role::SuperAdmin);
    app
}

fn valid_form<'a>(name: &'a str, phone: &'a str) -> [(&'static str, &'a str); 5] {
    [
        ("name", name),
        ("group", "B+"),
        ("city", "Mumbai"),
        ("phone", phone),
        ("last_donated", ""),
    ]
}

// =============================================================================
// Role: user
// =============================================================================

#[tokio::test]
async fn test_user_sees_badge_and_no_mutation_controls() {
    let app = app();
    app.seed_donor("Asha Rao", "B+", "Mumbai", "+911234567890");
    app.seed_donor("Vikram", "O-", "Pune", "9876543210");

    let mut client = app.sign_in(USER).await;
    let page = client.get("/donors").await;

    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("USER"));
    assert!(page.body.contains("Asha Rao"));
    assert!(page.body.contains("Vikram"));
    assert!(!page.body.contains("/donors/new"), "add control must be hidden");
    assert!(!page.body.contains("/delete"), "delete control must be hidden");
    assert!(page.body.contains("tel:+911234567890"));
    assert!(page.body.contains("wa.me"));
}

#[tokio::test]
async fn test_user_add_is_rejected_before_any_remote_call() {
    let app = app();
    let mut client = app.sign_in(USER).await;

    let form = client.get("/donors/new").await;
    assert_eq!(form.status, StatusCode::FORBIDDEN);

    let response = client
        .post_form("/donors", &valid_form("Asha", "+911234567890"))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert!(response.body.contains(ADD_FORBIDDEN));
    assert_eq!(app.store.mutation_calls(), 0);
    assert!(app.store.documents(DONORS).is_empty());
}

#[tokio::test]
async fn test_user_delete_is_rejected_before_any_remote_call() {
    let app = app();
    let id = app.seed_donor("Asha Rao", "B+", "Mumbai", "+911234567890");
    let mut client = app.sign_in(USER).await;

    let response = client
        .post_form(&format!("/donors/{id}/delete"), &[("confirm", "yes")])
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert!(response.body.contains(DELETE_FORBIDDEN));
    assert_eq!(app.store.mutation_calls(), 0);
    assert_eq!(app.store.documents(DONORS).len(), 1);
}

// =============================================================================
// Role: admin
// =============================================================================

#[tokio::test]
async fn test_admin_adds_donor_with_default_last_donated() {
    let app = app();
    let mut client = app.sign_in(ADMIN).await;

    let page = client.get("/donors").await;
    assert!(page.body.contains("ADMIN"));
    assert!(page.body.contains("/donors/new"), "add control must be visible");
    assert!(page.body.contains("No donors found."));

    let response = client
        .post_form("/donors", &valid_form("Meena", "+911234567890"))
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/donors"));

    let stored = app.store.documents(DONORS);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].str_field("phone"), Some("+911234567890"));
    assert_eq!(stored[0].str_field("lastDonated"), Some("N/A"));
    assert_eq!(app.store.insert_calls(), 1);

    let page = client.get("/donors").await;
    assert!(page.body.contains("Donor Added Successfully!"));
    assert!(page.body.contains("Meena"));
    assert!(page.body.contains("N/A"));
    assert!(!page.body.contains("/delete"), "admin must not see delete");

    // The success alert is shown once
    let page = client.get("/donors").await;
    assert!(!page.body.contains("Donor Added Successfully!"));
}

#[tokio::test]
async fn test_admin_cannot_delete() {
    let app = app();
    let id = app.seed_donor("Asha Rao", "B+", "Mumbai", "+911234567890");
    let mut client = app.sign_in(ADMIN).await;

    let confirm = client.get(&format!("/donors/{id}/delete")).await;
    assert_eq!(confirm.status, StatusCode::FORBIDDEN);

    let response = client
        .post_form(&format!("/donors/{id}/delete"), &[("confirm", "yes")])
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert!(response.body.contains(DELETE_FORBIDDEN));
    assert_eq!(app.store.delete_calls(), 0);
}

#[tokio::test]
async fn test_invalid_form_keeps_input_and_makes_no_call() {
    let app = app();
    let mut client = app.sign_in(ADMIN).await;

    let response = client
        .post_form("/donors", &valid_form("Meena", "call me maybe"))
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("value=\"Meena\""));
    assert!(response.body.contains("value=\"Mumbai\""));
    assert_eq!(app.store.mutation_calls(), 0);
}

#[tokio::test]
async fn test_failed_insert_shows_error_and_keeps_input() {
    let app = app();
    let mut client = app.sign_in(ADMIN).await;
    app.store.set_fail_writes(true);

    let response = client
        .post_form("/donors", &valid_form("Meena", "+911234567890"))
        .await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert!(response.body.contains("Error adding donor:"));
    assert!(response.body.contains("value=\"Meena\""));
    assert!(app.store.documents(DONORS).is_empty());
}

// =============================================================================
// Role: super admin
// =============================================================================

#[tokio::test]
async fn test_super_admin_delete_declined_then_confirmed() {
    let app = app();
    let id = app.seed_donor("Asha Rao", "B+", "Mumbai", "+911234567890");
    app.seed_donor("Vikram", "O-", "Pune", "9876543210");
    let mut client = app.sign_in(SUPER).await;

    let page = client.get("/donors").await;
    assert!(page.body.contains("SUPER_ADMIN"));
    assert!(page.body.contains(&format!("/donors/{id}/delete")));

    let confirm = client.get(&format!("/donors/{id}/delete")).await;
    assert_eq!(confirm.status, StatusCode::OK);
    assert!(confirm.body.contains("Are you sure you want to delete this donor?"));
    assert!(confirm.body.contains("Asha Rao"));

    // Declined: nothing is sent to the store
    let declined = client
        .post_form(&format!("/donors/{id}/delete"), &[("confirm", "no")])
        .await;
    assert_eq!(declined.status, StatusCode::SEE_OTHER);
    assert_eq!(app.store.delete_calls(), 0);
    assert!(client.get("/donors").await.body.contains("Asha Rao"));

    // Confirmed: removed from the store and from the next load
    let confirmed = client
        .post_form(&format!("/donors/{id}/delete"), &[("confirm", "yes")])
        .await;
    assert_eq!(confirmed.status, StatusCode::SEE_OTHER);
    assert_eq!(app.store.delete_calls(), 1);
    assert_eq!(app.store.documents(DONORS).len(), 1);

    let page = client.get("/donors").await;
    assert!(!page.body.contains("Asha Rao"));
    assert!(page.body.contains("Vikram"));
}

#[tokio::test]
async fn test_failed_delete_shows_alert() {
    let app = app();
    let id = app.seed_donor("Asha Rao", "B+", "Mumbai", "+911234567890");
    let mut client = app.sign_in(SUPER).await;
    app.store.set_fail_writes(true);

    let response = client
        .post_form(&format!("/donors/{id}/delete"), &[("confirm", "yes")])
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    let page = client.get("/donors").await;
    assert!(page.body.contains("Delete failed:"));
    assert!(page.body.contains("Asha Rao"));
}

// =============================================================================
// Filtering and loading
// =============================================================================

#[tokio::test]
async fn test_group_and_search_filter_is_remembered() {
    let app = app();
    app.seed_donor("Asha Rao", "B+", "Mumbai", "+911234567890");
    app.seed_donor("Meena", "B+", "Delhi", "9876543210");
    app.seed_donor("Kumar", "O+", "Mumbai", "9123456780");
    let mut client = app.sign_in(USER).await;

    let page = client.get("/donors?group=B%2B&q=MUM").await;
    assert!(page.body.contains("Asha Rao"));
    assert!(!page.body.contains("Meena"));
    assert!(!page.body.contains("Kumar"));

    // Without query parameters the previous filter still applies
    let page = client.get("/donors").await;
    assert!(page.body.contains("Asha Rao"));
    assert!(!page.body.contains("Kumar"));

    let page = client.get("/donors?group=All&q=").await;
    assert!(page.body.contains("Asha Rao"));
    assert!(page.body.contains("Meena"));
    assert!(page.body.contains("Kumar"));

    let page = client.get("/donors?q=nobody").await;
    assert!(page.body.contains("No donors found."));
}

#[tokio::test]
async fn test_read_failure_fails_closed_and_refresh_recovers() {
    let app = app();
    app.seed_donor("Asha Rao", "B+", "Mumbai", "+911234567890");
    app.store.set_fail_reads(true);

    // Role lookup fails too, so even the admin account is treated as a user
    let mut client = app.sign_in(ADMIN).await;
    let page = client.get("/donors").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("USER"));
    assert!(page.body.contains("Error loading donors"));
    assert!(!page.body.contains("Asha Rao"));

    app.store.set_fail_reads(false);
    let refreshed = client.post_form("/donors/refresh", &[]).await;
    assert_eq!(refreshed.status, StatusCode::SEE_OTHER);

    let page = client.get("/donors").await;
    assert!(page.body.contains("Asha Rao"));
    assert!(!page.body.contains("Error loading donors"));
}

#[tokio::test]
async fn test_donor_with_missing_fields_renders() {
    let app = app();
    app.store
        .seed(DONORS, donor_finder_web::services::store::Fields::new());
    let mut client = app.sign_in(USER).await;

    let page = client.get("/donors").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("N/A"));

    let page = client.get("/donors?q=mum").await;
    assert!(page.body.contains("No donors found."));
}
