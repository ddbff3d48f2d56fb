//! Integration test for the background housekeeping sweep.

mod common;

use axum::http::StatusCode;
use common::{build_test_app, login, post_auth, register_admin, STRONG_PASSWORD};
use sqlx::PgPool;
use gatekeeper_api::background::housekeeping;

/// A logged-out session is deleted by the sweep; the live one stays.
#[sqlx::test(migrations = "../db/migrations")]
async fn sweep_removes_revoked_sessions(pool: PgPool) {
    let (live, _) = register_admin(&pool).await;
    let stale = login(&pool, "admin@example.com", STRONG_PASSWORD).await;

    let response = post_auth(build_test_app(pool.clone()), "/api/logout", &stale).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    housekeeping::sweep(&pool).await;

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_sessions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 1);

    let response = common::get_auth(build_test_app(pool), "/api/iam/me", &live).await;
    assert_eq!(response.status(), StatusCode::OK);
}
