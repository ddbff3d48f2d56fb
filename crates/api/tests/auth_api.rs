//! HTTP-level integration tests for registration, login, lockout and logout.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_app_with_config, build_test_app, get, get_auth, login, post_auth,
    post_json, register_admin, test_config, STRONG_PASSWORD,
};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// The first account becomes an administrator holding the admin role.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_first_registration_creates_admin(pool: PgPool) {
    let (token, user) = register_admin(&pool).await;

    assert!(!token.is_empty());
    assert_eq!(user["email"], "admin@example.com");
    assert_eq!(user["is_admin"], true);
    let roles: Vec<&str> = user["roles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["admin"]);
}

/// Once an account exists, registration is closed by default.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_registration_closed_after_first_user(pool: PgPool) {
    register_admin(&pool).await;

    let body = json!({ "email": "late@example.com", "password": STRONG_PASSWORD });
    let response = post_json(build_test_app(pool), "/api/register", body).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// With open registration, later accounts get the `user` role only.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_open_registration_assigns_user_role(pool: PgPool) {
    register_admin(&pool).await;

    let mut config = test_config();
    config.allow_open_registration = true;
    let body = json!({ "email": "Second@Example.com", "password": STRONG_PASSWORD });
    let response = post_json(build_app_with_config(pool, config), "/api/auth/signup", body).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["user"]["email"], "second@example.com");
    assert_eq!(json["user"]["is_admin"], false);
    assert_eq!(json["user"]["roles"][0]["name"], "user");
}

/// Passwords violating the default policy are rejected.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_weak_password_rejected(pool: PgPool) {
    let body = json!({ "email": "weak@example.com", "password": "short" });
    let response = post_json(build_test_app(pool), "/api/register", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

/// The status endpoint reports whether setup has happened.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_system_status_tracks_first_user(pool: PgPool) {
    let json = body_json(get(build_test_app(pool.clone()), "/api/system/status").await).await;
    assert_eq!(json["hasUsers"], false);
    assert_eq!(json["registrationOpen"], true);

    register_admin(&pool).await;

    let json = body_json(get(build_test_app(pool), "/api/system/status").await).await;
    assert_eq!(json["hasUsers"], true);
    assert_eq!(json["registrationOpen"], false);
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

/// Login is case-insensitive on the email and returns a working token.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_login_success(pool: PgPool) {
    register_admin(&pool).await;

    let body = json!({ "email": "ADMIN@example.com", "password": STRONG_PASSWORD });
    let response = post_json(build_test_app(pool.clone()), "/api/login", body).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["token"].is_string());
    assert!(json["expires_in"].as_i64().unwrap() > 0);
    assert_eq!(json["user"]["email"], "admin@example.com");

    let token = json["token"].as_str().unwrap();
    let me = get_auth(build_test_app(pool), "/api/iam/me", token).await;
    assert_eq!(me.status(), StatusCode::OK);
}

/// Unknown emails and wrong passwords both yield 401.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_login_bad_credentials(pool: PgPool) {
    register_admin(&pool).await;

    let wrong = json!({ "email": "admin@example.com", "password": "Wrong-pass1!" });
    let response = post_json(build_test_app(pool.clone()), "/api/login", wrong).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let ghost = json!({ "email": "ghost@example.com", "password": STRONG_PASSWORD });
    let response = post_json(build_test_app(pool), "/api/login", ghost).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// Missing fields are a 400, not a 401.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_login_requires_both_fields(pool: PgPool) {
    let body = json!({ "email": "", "password": "" });
    let response = post_json(build_test_app(pool), "/api/login", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Five wrong passwords lock the account; even the right password is then refused.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_account_lockout(pool: PgPool) {
    register_admin(&pool).await;

    for _ in 0..5 {
        let body = json!({ "email": "admin@example.com", "password": "Wrong-pass1!" });
        let response = post_json(build_test_app(pool.clone()), "/api/login", body).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let body = json!({ "email": "admin@example.com", "password": STRONG_PASSWORD });
    let response = post_json(build_test_app(pool), "/api/login", body).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Logout and token handling
// ---------------------------------------------------------------------------

/// Logout revokes the session, so the token stops working immediately.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_logout_revokes_token(pool: PgPool) {
    register_admin(&pool).await;
    let token = login(&pool, "admin@example.com", STRONG_PASSWORD).await;

    let response = post_auth(build_test_app(pool.clone()), "/api/logout", &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get_auth(build_test_app(pool), "/api/iam/me", &token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// Protected routes reject missing and malformed tokens.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_protected_route_requires_token(pool: PgPool) {
    let response = get(build_test_app(pool.clone()), "/api/iam/me").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get_auth(build_test_app(pool), "/api/iam/me", "not-a-jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
