//! HTTP-level integration tests for the audit trail, its export and the
//! activity feed.

mod common;

use axum::http::{header, StatusCode};
use common::{body_json, body_text, build_test_app, create_member, get_auth, register_admin};
use sqlx::PgPool;

#[sqlx::test(migrations = "../db/migrations")]
async fn test_query_filters_by_action(pool: PgPool) {
    let (token, _) = register_admin(&pool).await;
    create_member(&pool, &token, "bob@example.com").await;

    let response = get_auth(
        build_test_app(pool.clone()),
        "/api/iam/audit-logs?action=create&resource_type=user",
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["action"], "create");

    let response = get_auth(build_test_app(pool), "/api/iam/audit-logs?from=last-week", &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_export_formats(pool: PgPool) {
    let (token, _) = register_admin(&pool).await;

    let response = get_auth(
        build_test_app(pool.clone()),
        "/api/iam/audit-logs/export?format=csv",
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let csv = body_text(response).await;
    assert!(csv.starts_with("id,timestamp,user_id"));
    assert!(csv.lines().count() >= 2);

    let response = get_auth(
        build_test_app(pool.clone()),
        "/api/iam/audit-logs/export?format=json&from=2020-01-01",
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!body_json(response).await.as_array().unwrap().is_empty());

    let response = get_auth(build_test_app(pool), "/api/iam/audit-logs/export?format=xml", &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Users without `audit:read` only see their own activity.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_activity_scoped_to_caller(pool: PgPool) {
    let (admin_token, admin) = register_admin(&pool).await;
    let (member_token, member) = create_member(&pool, &admin_token, "bob@example.com").await;

    let response = get_auth(build_test_app(pool.clone()), "/api/iam/audit-logs", &member_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let uri = format!("/api/iam/activity?userId={}&limit=500", admin["id"].as_str().unwrap());
    let response = get_auth(build_test_app(pool.clone()), &uri, &member_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await;
    assert_eq!(page["page"], 1);
    assert_eq!(page["limit"], 100);
    let logs = page["logs"].as_array().unwrap();
    assert!(!logs.is_empty());
    assert!(logs.iter().all(|l| l["user_id"] == member["id"]));

    let response = get_auth(build_test_app(pool), "/api/iam/activity?page=2&limit=1", &admin_token).await;
    let page = body_json(response).await;
    assert_eq!(page["page"], 2);
    assert_eq!(page["logs"].as_array().unwrap().len(), 1);
    assert!(page["total"].as_i64().unwrap() >= 2);
}

/// Page numbers far past the end return an empty page.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_activity_huge_page_is_empty(pool: PgPool) {
    let (token, _) = register_admin(&pool).await;

    let uri = format!("/api/iam/activity?page={}", i64::MAX);
    let response = get_auth(build_test_app(pool), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await;
    assert_eq!(page["page"], i64::MAX);
    assert!(page["logs"].as_array().unwrap().is_empty());
}
