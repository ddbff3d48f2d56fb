//! HTTP-level integration tests for invitations and their acceptance.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, create_member, delete_auth, get_auth, post_json,
    post_json_auth, register_admin, STRONG_PASSWORD,
};
use serde_json::{json, Value};
use sqlx::PgPool;

fn token_from_link(link: &str) -> String {
    link.split("token=").nth(1).unwrap().to_string()
}

async fn invite(pool: &PgPool, token: &str, body: Value) -> Value {
    let response =
        post_json_auth(build_test_app(pool.clone()), "/api/iam/invitations", token, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_invite_and_accept(pool: PgPool) {
    let (admin_token, _) = register_admin(&pool).await;

    let created = invite(&pool, &admin_token, json!({ "email": "New@Example.com", "firstName": "Nia" })).await;
    assert_eq!(created["email"], "new@example.com");
    assert_eq!(created["role_name"], "user");
    assert!(created.get("token_hash").is_none());
    let link = created["invitation_link"].as_str().unwrap();
    assert!(link.starts_with("http://localhost:3000/accept-invitation?token="));

    let pending = body_json(get_auth(build_test_app(pool.clone()), "/api/iam/invitations", &admin_token).await).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let body = json!({ "token": token_from_link(link), "password": STRONG_PASSWORD });
    let response = post_json(build_test_app(pool.clone()), "/api/accept-invitation", body.clone()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let accepted = body_json(response).await;
    assert_eq!(accepted["user"]["email"], "new@example.com");
    assert_eq!(accepted["user"]["first_name"], "Nia");
    assert_eq!(accepted["user"]["roles"][0]["name"], "user");

    let response = post_json(build_test_app(pool.clone()), "/api/accept-invitation", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let pending = body_json(get_auth(build_test_app(pool), "/api/iam/invitations", &admin_token).await).await;
    assert!(pending.as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_duplicate_invitations_conflict(pool: PgPool) {
    let (admin_token, _) = register_admin(&pool).await;
    invite(&pool, &admin_token, json!({ "email": "new@example.com" })).await;

    for email in ["new@example.com", "admin@example.com"] {
        let response = post_json_auth(
            build_test_app(pool.clone()),
            "/api/iam/invitations",
            &admin_token,
            json!({ "email": email }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT, "email: {email}");
    }
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_revoked_invitation_cannot_be_accepted(pool: PgPool) {
    let (admin_token, _) = register_admin(&pool).await;
    let created = invite(&pool, &admin_token, json!({ "email": "new@example.com" })).await;

    let uri = format!("/api/iam/invitations/{}", created["id"].as_str().unwrap());
    let response = delete_auth(build_test_app(pool.clone()), &uri, &admin_token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let token = token_from_link(created["invitation_link"].as_str().unwrap());
    let body = json!({ "token": token, "password": STRONG_PASSWORD });
    let response = post_json(build_test_app(pool), "/api/accept-invitation", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_unknown_token_is_not_found(pool: PgPool) {
    let body = json!({ "token": "does-not-exist", "password": STRONG_PASSWORD });
    let response = post_json(build_test_app(pool), "/api/accept-invitation", body).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_members_cannot_invite(pool: PgPool) {
    let (admin_token, _) = register_admin(&pool).await;
    let (member_token, _) = create_member(&pool, &admin_token, "bob@example.com").await;

    let response = post_json_auth(
        build_test_app(pool),
        "/api/iam/invitations",
        &member_token,
        json!({ "email": "new@example.com" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
