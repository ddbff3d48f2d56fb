//! HTTP-level integration tests for roles, permissions and groups, and for
//! how they combine into a user's effective permissions.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, create_holder_of, create_member, delete_auth, get_auth,
    post_json_auth, put_json_auth, register_admin,
};
use serde_json::{json, Value};
use sqlx::PgPool;

async fn role_by_name(pool: &PgPool, token: &str, name: &str) -> Value {
    let response = get_auth(build_test_app(pool.clone()), "/api/iam/roles", token).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response)
        .await
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["name"] == name)
        .cloned()
        .unwrap_or_else(|| panic!("role {name} should exist"))
}

async fn create_permission(pool: &PgPool, token: &str, body: Value) -> Value {
    let response =
        post_json_auth(build_test_app(pool.clone()), "/api/iam/permissions", token, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Seeded roles are listed with their permissions and assignment counts.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_seeded_roles(pool: PgPool) {
    let (token, _) = register_admin(&pool).await;

    let admin = role_by_name(&pool, &token, "admin").await;
    assert_eq!(admin["is_system_role"], true);
    assert_eq!(admin["user_count"], 1);
    assert!(!admin["permissions"].as_array().unwrap().is_empty());

    let user = role_by_name(&pool, &token, "user").await;
    assert_eq!(user["is_system_role"], true);
}

/// System roles cannot be deleted or renamed.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_system_role_is_protected(pool: PgPool) {
    let (token, _) = register_admin(&pool).await;
    let admin = role_by_name(&pool, &token, "admin").await;
    let uri = format!("/api/iam/roles/{}", admin["id"].as_str().unwrap());

    let response = delete_auth(build_test_app(pool.clone()), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response =
        put_json_auth(build_test_app(pool), &uri, &token, json!({ "name": "root" })).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_custom_role_lifecycle(pool: PgPool) {
    let (token, _) = register_admin(&pool).await;
    let perm = create_permission(&pool, &token, json!({ "name": "report:read" })).await;

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/iam/roles",
        &token,
        json!({ "name": "analysts", "description": "Reads reports", "permissions": [perm["id"]] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let role = body_json(response).await;
    assert_eq!(role["permissions"][0]["name"], "report:read");
    let uri = format!("/api/iam/roles/{}", role["id"].as_str().unwrap());

    let response = put_json_auth(
        build_test_app(pool.clone()),
        &uri,
        &token,
        json!({ "name": "report-readers", "permissions": [] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["name"], "report-readers");
    assert!(updated["permissions"].as_array().unwrap().is_empty());

    let response = delete_auth(build_test_app(pool.clone()), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get_auth(build_test_app(pool), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_duplicate_role_name_conflicts(pool: PgPool) {
    let (token, _) = register_admin(&pool).await;

    let response = post_json_auth(
        build_test_app(pool),
        "/api/iam/roles",
        &token,
        json!({ "name": "admin" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

/// A permission can be named directly or built from resource and action.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_permission_naming(pool: PgPool) {
    let (token, _) = register_admin(&pool).await;

    let built = create_permission(
        &pool,
        &token,
        json!({ "resource": "invoice", "action": "export" }),
    )
    .await;
    assert_eq!(built["name"], "invoice:export");

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/iam/permissions",
        &token,
        json!({ "name": "no-colon" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/iam/permissions",
        &token,
        json!({ "description": "nothing else" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let uri = format!("/api/iam/permissions/{}", built["id"].as_str().unwrap());
    let response =
        put_json_auth(build_test_app(pool), &uri, &token, json!({ "action": "read" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["name"], "invoice:read");
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// Roles attached to a group apply to its members.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_group_roles_grant_permissions(pool: PgPool) {
    let (token, _) = register_admin(&pool).await;
    let (member_token, member) = create_member(&pool, &token, "bob@example.com").await;

    let response = get_auth(build_test_app(pool.clone()), "/api/iam/users", &member_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let perms = body_json(get_auth(build_test_app(pool.clone()), "/api/iam/permissions", &token).await).await;
    let user_read = perms
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["name"] == "user:read")
        .unwrap()["id"]
        .clone();
    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/iam/roles",
        &token,
        json!({ "name": "directory", "permissions": [user_read] }),
    )
    .await;
    let role = body_json(response).await;

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/iam/groups",
        &token,
        json!({ "name": "Support", "roles": [role["id"]] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let group = body_json(response).await;
    let group_uri = format!("/api/iam/groups/{}", group["id"].as_str().unwrap());

    let response = post_json_auth(
        build_test_app(pool.clone()),
        &format!("{group_uri}/members"),
        &token,
        json!({ "user_id": member["id"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["members"][0]["email"], "bob@example.com");

    let response = get_auth(build_test_app(pool.clone()), "/api/iam/users", &member_token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let member_uri = format!("{group_uri}/members/{}", member["id"].as_str().unwrap());
    let response = delete_auth(build_test_app(pool.clone()), &member_uri, &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = delete_auth(build_test_app(pool.clone()), &member_uri, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get_auth(build_test_app(pool), "/api/iam/users", &member_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_group_update_replaces_members(pool: PgPool) {
    let (token, admin) = register_admin(&pool).await;
    let (_, member) = create_member(&pool, &token, "bob@example.com").await;

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/iam/groups",
        &token,
        json!({ "name": "Ops", "members": [admin["id"], member["id"]] }),
    )
    .await;
    let group = body_json(response).await;
    assert_eq!(group["members"].as_array().unwrap().len(), 2);

    let uri = format!("/api/iam/groups/{}", group["id"].as_str().unwrap());
    let response = put_json_auth(
        build_test_app(pool.clone()),
        &uri,
        &token,
        json!({ "members": [member["id"]] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["members"].as_array().unwrap().len(), 1);
    assert_eq!(updated["members"][0]["email"], "bob@example.com");

    let response = delete_auth(build_test_app(pool), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

/// A `group:write` holder cannot reach the admin role through a group.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_group_cannot_carry_admin_for_non_admin(pool: PgPool) {
    let (token, _) = register_admin(&pool).await;
    let (writer_token, writer) =
        create_holder_of(&pool, &token, "writer@example.com", "group:write").await;
    let admin_role = role_by_name(&pool, &token, "admin").await;

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/iam/groups",
        &writer_token,
        json!({ "name": "Escalate", "members": [writer["id"]], "roles": [admin_role["id"]] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/iam/groups",
        &token,
        json!({ "name": "Admins", "roles": [admin_role["id"]] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let group = body_json(response).await;
    let uri = format!("/api/iam/groups/{}", group["id"].as_str().unwrap());

    let response = post_json_auth(
        build_test_app(pool.clone()),
        &format!("{uri}/members"),
        &writer_token,
        json!({ "user_id": writer["id"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = put_json_auth(
        build_test_app(pool.clone()),
        &uri,
        &writer_token,
        json!({ "members": [writer["id"]] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = put_json_auth(
        build_test_app(pool.clone()),
        &uri,
        &writer_token,
        json!({ "description": "Full access" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get_auth(build_test_app(pool), "/api/iam/audit-logs", &writer_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
