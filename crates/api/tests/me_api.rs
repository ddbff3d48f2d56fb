//! HTTP-level integration tests for the self-service `/api/iam/me` endpoints.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, get_auth, login, post_auth, post_json, put_json_auth,
    register_admin, STRONG_PASSWORD,
};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../db/migrations")]
async fn test_me_reports_effective_permissions(pool: PgPool) {
    let (token, _) = register_admin(&pool).await;

    let response = get_auth(build_test_app(pool), "/api/iam/me", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["email"], "admin@example.com");
    assert_eq!(json["password_expired"], false);
    let permissions = json["permissions"].as_array().unwrap();
    assert!(permissions.iter().any(|p| p == "user:write"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_update_profile(pool: PgPool) {
    let (token, _) = register_admin(&pool).await;

    let response = put_json_auth(
        build_test_app(pool),
        "/api/iam/me/profile",
        &token,
        json!({ "firstName": "Grace", "lastName": "Hopper" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["first_name"], "Grace");
    assert_eq!(json["last_name"], "Hopper");
}

/// Changing the password keeps the current session and revokes the others.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_change_password(pool: PgPool) {
    let (first, _) = register_admin(&pool).await;
    let second = login(&pool, "admin@example.com", STRONG_PASSWORD).await;

    let response = put_json_auth(
        build_test_app(pool.clone()),
        "/api/iam/me/password",
        &first,
        json!({ "current_password": "Wrong-pass1!", "new_password": "An0ther-secret!" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = put_json_auth(
        build_test_app(pool.clone()),
        "/api/iam/me/password",
        &first,
        json!({ "currentPassword": STRONG_PASSWORD, "newPassword": "An0ther-secret!" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get_auth(build_test_app(pool.clone()), "/api/iam/me", &first).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = get_auth(build_test_app(pool.clone()), "/api/iam/me", &second).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let old = json!({ "email": "admin@example.com", "password": STRONG_PASSWORD });
    let response = post_json(build_test_app(pool.clone()), "/api/login", old).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    login(&pool, "admin@example.com", "An0ther-secret!").await;
}

/// Recently used passwords cannot be chosen again.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_password_history_enforced(pool: PgPool) {
    let (token, _) = register_admin(&pool).await;

    let response = put_json_auth(
        build_test_app(pool.clone()),
        "/api/iam/me/password",
        &token,
        json!({ "current_password": STRONG_PASSWORD, "new_password": "An0ther-secret!" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = put_json_auth(
        build_test_app(pool),
        "/api/iam/me/password",
        &token,
        json!({ "current_password": "An0ther-secret!", "new_password": STRONG_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_session_listing_and_revocation(pool: PgPool) {
    let (first, _) = register_admin(&pool).await;
    let second = login(&pool, "admin@example.com", STRONG_PASSWORD).await;
    let third = login(&pool, "admin@example.com", STRONG_PASSWORD).await;

    let sessions = body_json(get_auth(build_test_app(pool.clone()), "/api/iam/me/sessions", &first).await).await;
    let sessions = sessions.as_array().unwrap();
    assert_eq!(sessions.len(), 3);
    assert_eq!(sessions.iter().filter(|s| s["current"] == true).count(), 1);

    let other = sessions.iter().find(|s| s["current"] == false).unwrap();
    let uri = format!("/api/iam/me/sessions/{}/revoke", other["id"].as_str().unwrap());
    let response = post_auth(build_test_app(pool.clone()), &uri, &first).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_auth(build_test_app(pool.clone()), "/api/iam/me/sessions/revoke-all", &first).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["revoked"], 1);

    for token in [&second, &third] {
        let response = get_auth(build_test_app(pool.clone()), "/api/iam/me", token).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    let response = get_auth(build_test_app(pool), "/api/iam/me", &first).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_my_activity_lists_own_events(pool: PgPool) {
    let (token, _) = register_admin(&pool).await;

    let response = get_auth(build_test_app(pool), "/api/iam/me/activity?limit=5", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let logs = body_json(response).await;
    let actions: Vec<&str> = logs
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["action"].as_str().unwrap())
        .collect();
    assert!(actions.contains(&"register"), "actions: {actions:?}");
}
