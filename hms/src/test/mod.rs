//! End-to-end HTTP tests against the in-memory store.

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::{
    api::models::accounts::{AccountStatus, Role},
    audit::AuditAction,
    db::handlers::AccountStore,
    test_utils::{bearer, create_test_app, create_test_app_with_config, create_test_config},
};

fn register_body(email: &str, password: &str) -> Value {
    json!({
        "email": email,
        "password": password,
        "first_name": "Ada",
        "last_name": "Lovelace",
    })
}

#[test_log::test(tokio::test)]
async fn test_register_login_me_refresh_logout() {
    let app = create_test_app().await;

    let response = app.server.post("/api/v1/auth/register").json(&register_body("a@x.com", "Str0ng!Pass")).await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["statusCode"], 201);
    assert!(body["timestamp"].is_string());
    let body = &body["data"];
    assert_eq!(body["user"]["email"], "a@x.com");
    assert_eq!(body["user"]["role"], "PATIENT");
    assert_eq!(body["user"]["status"], "ACTIVE");
    assert_eq!(body["expires_in"], 86400);
    assert!(body["user"].get("password_hash").is_none());

    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "a@x.com", "password": "Str0ng!Pass" }))
        .await;
    response.assert_status_ok();
    let login: Value = response.json();
    assert_eq!(login["statusCode"], 200);
    let login = &login["data"];
    let access_token = login["access_token"].as_str().unwrap().to_string();
    let refresh_token = login["refresh_token"].as_str().unwrap().to_string();

    let response = app.server.get("/api/v1/auth/me").add_header("authorization", bearer(&access_token)).await;
    response.assert_status_ok();
    let me: Value = response.json();
    let me = &me["data"];
    assert_eq!(me["email"], "a@x.com");
    assert_eq!(me["id"], login["user"]["id"]);

    let response = app
        .server
        .post("/api/v1/auth/refresh")
        .json(&json!({ "refresh_token": refresh_token }))
        .await;
    response.assert_status_ok();
    let refreshed: Value = response.json();
    assert_eq!(refreshed["data"]["user"]["id"], login["user"]["id"]);

    // A refresh token is not an access token
    let response = app.server.get("/api/v1/auth/me").add_header("authorization", bearer(&refresh_token)).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_TOKEN");

    let response = app.server.post("/api/v1/auth/logout").add_header("authorization", bearer(&access_token)).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["message"], "Logged out successfully");

    let entries = app.audit.wait_for(2, Duration::from_secs(5)).await;
    let actions: Vec<AuditAction> = entries.iter().map(|entry| entry.action).collect();
    assert_eq!(actions, vec![AuditAction::Register, AuditAction::Login]);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = create_test_app().await;

    app.server
        .post("/api/v1/auth/register")
        .json(&register_body("dup@x.com", "Str0ng!Pass"))
        .await
        .assert_status(StatusCode::CREATED);

    let response = app.server.post("/api/v1/auth/register").json(&register_body("dup@x.com", "An0ther!Pass")).await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "USER_EXISTS");
    assert_eq!(body["statusCode"], 409);
    assert_eq!(app.accounts.len(), 1);
}

#[tokio::test]
async fn test_weak_password_lists_every_reason() {
    let app = create_test_app().await;

    let response = app.server.post("/api/v1/auth/register").json(&register_body("weak@x.com", "abc")).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "WEAK_PASSWORD");
    assert_eq!(
        body["details"]["reasons"],
        json!([
            "Password must be at least 8 characters long",
            "Password must contain at least one uppercase letter",
            "Password must contain at least one number",
            "Password must contain at least one special character",
        ])
    );
    assert!(app.accounts.is_empty());
}

#[tokio::test]
async fn test_register_validation_errors() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({ "email": "a@x.com", "password": "Str0ng!Pass" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"], "Missing required fields");

    let response = app.server.post("/api/v1/auth/register").json(&register_body("not-an-email", "Str0ng!Pass")).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = app
        .server
        .post("/api/v1/auth/register")
        .content_type("application/json")
        .bytes("{not json".into())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_registration_disabled() {
    let mut config = create_test_config();
    config.auth.allow_registration = false;
    let app = create_test_app_with_config(config).await;

    let response = app.server.post("/api/v1/auth/register").json(&register_body("a@x.com", "Str0ng!Pass")).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(app.accounts.is_empty());
}

#[tokio::test]
async fn test_login_failures() {
    let app = create_test_app().await;
    app.seed_account("active@x.com", "Str0ng!Pass", Role::Doctor, AccountStatus::Active).await;
    app.seed_account("suspended@x.com", "Str0ng!Pass", Role::Nurse, AccountStatus::Suspended).await;

    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "active@x.com", "password": "Wr0ng!Pass" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let wrong_password: Value = response.json();
    assert_eq!(wrong_password["code"], "INVALID_CREDENTIALS");

    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "nobody@x.com", "password": "Str0ng!Pass" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let unknown: Value = response.json();
    assert_eq!(unknown["error"], wrong_password["error"]);

    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "suspended@x.com", "password": "Str0ng!Pass" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["code"], "USER_INACTIVE");
    assert_eq!(body["details"]["status"], "SUSPENDED");

    let response = app.server.post("/api/v1/auth/login").json(&json!({ "email": "active@x.com" })).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Email and password required");

    // Longer than any password the policy accepts
    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "active@x.com", "password": "A1!".repeat(50) }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_soft_deleted_account_cannot_login() {
    let app = create_test_app().await;
    let account = app.seed_account("gone@x.com", "Str0ng!Pass", Role::Patient, AccountStatus::Active).await;
    assert!(app.accounts.soft_delete(account.id).await.unwrap());

    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "gone@x.com", "password": "Str0ng!Pass" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_bearer_token_required() {
    let app = create_test_app().await;

    let response = app.server.get("/api/v1/auth/me").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["code"], "UNAUTHENTICATED");

    let response = app.server.get("/api/v1/auth/me").add_header("authorization", "Basic dXNlcjpwYXNz").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["code"], "UNAUTHENTICATED");

    let response = app.server.get("/api/v1/auth/me").add_header("authorization", bearer("garbage")).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_TOKEN");

    let response = app.server.post("/api/v1/auth/logout").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_rejects_bad_tokens() {
    let app = create_test_app().await;

    let response = app.server.post("/api/v1/auth/refresh").json(&json!({ "refresh_token": "garbage" })).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_TOKEN");

    let response = app.server.post("/api/v1/auth/refresh").json(&json!({})).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // An access token is not a refresh token
    let (_, access_token) = app.login_as("doc@x.com", Role::Doctor).await;
    let response = app
        .server
        .post("/api/v1/auth/refresh")
        .json(&json!({ "refresh_token": access_token }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_after_suspension_is_rejected() {
    let app = create_test_app().await;
    let account = app.seed_account("nurse@x.com", "Str0ng!Pass", Role::Nurse, AccountStatus::Active).await;

    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "nurse@x.com", "password": "Str0ng!Pass" }))
        .await;
    let login: Value = response.json();
    let refresh_token = login["data"]["refresh_token"].as_str().unwrap().to_string();

    app.accounts
        .update(
            account.id,
            &crate::db::models::accounts::AccountUpdateDBRequest {
                role: None,
                status: Some(AccountStatus::Suspended),
            },
        )
        .await
        .unwrap();

    let response = app
        .server
        .post("/api/v1/auth/refresh")
        .json(&json!({ "refresh_token": refresh_token }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["code"], "USER_INACTIVE");
}

#[tokio::test]
async fn test_accounts_require_admin() {
    let app = create_test_app().await;
    let (doctor, token) = app.login_as("doc@x.com", Role::Doctor).await;

    let response = app
        .server
        .get(&format!("/api/v1/accounts/{}", doctor.id))
        .add_header("authorization", bearer(&token))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["code"], "FORBIDDEN");
    assert_eq!(body["error"], "Insufficient permissions");

    let response = app
        .server
        .delete(&format!("/api/v1/accounts/{}", doctor.id))
        .add_header("authorization", bearer(&token))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_manages_staff() {
    let app = create_test_app().await;
    let (admin, token) = app.login_as("admin@x.com", Role::Admin).await;
    let nurse = app.seed_account("nurse@x.com", "Str0ng!Pass", Role::Nurse, AccountStatus::Active).await;

    let response = app
        .server
        .get(&format!("/api/v1/accounts/{}", nurse.id))
        .add_header("authorization", bearer(&token))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["role"], "NURSE");

    let response = app
        .server
        .patch(&format!("/api/v1/accounts/{}", nurse.id))
        .add_header("authorization", bearer(&token))
        .json(&json!({ "role": "DOCTOR", "status": "SUSPENDED" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["role"], "DOCTOR");
    assert_eq!(body["data"]["status"], "SUSPENDED");

    let response = app
        .server
        .delete(&format!("/api/v1/accounts/{}", nurse.id))
        .add_header("authorization", bearer(&token))
        .await;
    response.assert_status(StatusCode::NO_CONTENT);

    let response = app
        .server
        .get(&format!("/api/v1/accounts/{}", nurse.id))
        .add_header("authorization", bearer(&token))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], "USER_NOT_FOUND");

    let entries = app.audit.wait_for(3, Duration::from_secs(5)).await;
    let update = entries.iter().find(|e| e.action == AuditAction::UpdateAccount).unwrap();
    assert_eq!(update.actor_id, Some(admin.id));
    assert_eq!(update.payload["before"]["role"], "NURSE");
    assert_eq!(update.payload["after"]["role"], "DOCTOR");
    assert!(entries.iter().any(|e| e.action == AuditAction::DeleteAccount));
}

#[tokio::test]
async fn test_admin_cannot_escalate_or_touch_super_admin() {
    let app = create_test_app().await;
    let (_, token) = app.login_as("admin@x.com", Role::Admin).await;
    let root = app.seed_account("root@x.com", "Str0ng!Pass", Role::SuperAdmin, AccountStatus::Active).await;
    let clerk = app.seed_account("clerk@x.com", "Str0ng!Pass", Role::Receptionist, AccountStatus::Active).await;

    let response = app
        .server
        .patch(&format!("/api/v1/accounts/{}", root.id))
        .add_header("authorization", bearer(&token))
        .json(&json!({ "status": "SUSPENDED" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let response = app
        .server
        .delete(&format!("/api/v1/accounts/{}", root.id))
        .add_header("authorization", bearer(&token))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let response = app
        .server
        .patch(&format!("/api/v1/accounts/{}", clerk.id))
        .add_header("authorization", bearer(&token))
        .json(&json!({ "role": "SUPER_ADMIN" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let unchanged = app.accounts.find_by_id(clerk.id).await.unwrap().unwrap();
    assert_eq!(unchanged.role, Role::Receptionist);
    let unchanged = app.accounts.find_by_id(root.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, AccountStatus::Active);
}

#[tokio::test]
async fn test_super_admin_manages_admins() {
    let app = create_test_app().await;
    let (_, token) = app.login_as("root@x.com", Role::SuperAdmin).await;
    let admin = app.seed_account("admin@x.com", "Str0ng!Pass", Role::Admin, AccountStatus::Active).await;

    let response = app
        .server
        .patch(&format!("/api/v1/accounts/{}", admin.id))
        .add_header("authorization", bearer(&token))
        .json(&json!({ "status": "INACTIVE" }))
        .await;
    response.assert_status_ok();

    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "admin@x.com", "password": "Str0ng!Pass" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_seeded_admin_can_login() {
    let mut config = create_test_config();
    config.admin_password = Some("Adm1n!Password".to_string());
    let app = create_test_app_with_config(config).await;

    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "admin@test.com", "password": "Adm1n!Password" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["user"]["role"], "SUPER_ADMIN");
}

#[tokio::test]
async fn test_health_and_docs() {
    let app = create_test_app().await;

    let response = app.server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["timestamp"].is_string());

    app.server.get("/api/docs").await.assert_status_ok();
}
