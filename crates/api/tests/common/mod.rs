#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use gatekeeper_api::auth::jwt::JwtConfig;
use gatekeeper_api::config::ServerConfig;
use gatekeeper_api::routes;
use gatekeeper_api::state::AppState;

/// Password that satisfies the default password policy.
pub const STRONG_PASSWORD: &str = "Sup3r-secret!";

/// Build a test `ServerConfig` with safe defaults.
///
/// Registration is closed once the first account exists, matching the
/// production default.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: String::new(),
        db_max_connections: 5,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_token_expiry_mins: 60,
        },
        session_expiry_days: 7,
        invitation_expiry_days: 7,
        allow_open_registration: false,
        public_base_url: "http://localhost:3000".to_string(),
        housekeeping_interval_secs: 300,
    }
}

/// Build the full application router with all middleware layers.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack production uses.
pub fn build_test_app(pool: PgPool) -> Router {
    build_app_with_config(pool, test_config())
}

pub fn build_app_with_config(pool: PgPool, config: ServerConfig) -> Router {
    let state = AppState {
        pool,
        config: Arc::new(config),
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:3000".parse().unwrap()])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .nest("/api", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(app: Router, uri: &str, token: &str, body: Value) -> Response {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn put_json_auth(app: Router, uri: &str, token: &str, body: Value) -> Response {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Collect the response body and parse it as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Collect the response body as text.
pub async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// ---------------------------------------------------------------------------
// Account helpers
// ---------------------------------------------------------------------------

/// Register the first account, which becomes the administrator. Returns the
/// bearer token and the user JSON.
pub async fn register_admin(pool: &PgPool) -> (String, Value) {
    let body = json!({
        "email": "admin@example.com",
        "password": STRONG_PASSWORD,
        "first_name": "Ada",
        "last_name": "Admin",
    });
    let response = post_json(build_test_app(pool.clone()), "/api/register", body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    (json["token"].as_str().unwrap().to_string(), json["user"].clone())
}

/// Create an ordinary account through the admin API and log it in.
pub async fn create_member(pool: &PgPool, admin_token: &str, email: &str) -> (String, Value) {
    let body = json!({ "email": email, "password": STRONG_PASSWORD });
    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/iam/users",
        admin_token,
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let user = body_json(response).await;

    let token = login(pool, email, STRONG_PASSWORD).await;
    (token, user)
}

/// Create an account whose only grant is a custom role holding `permission`,
/// and log it in.
pub async fn create_holder_of(
    pool: &PgPool,
    admin_token: &str,
    email: &str,
    permission: &str,
) -> (String, Value) {
    let perms =
        body_json(get_auth(build_test_app(pool.clone()), "/api/iam/permissions", admin_token).await).await;
    let perm_id = perms
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["name"] == permission)
        .unwrap_or_else(|| panic!("permission {permission} should be seeded"))["id"]
        .clone();

    let role_name = format!("holds-{}", permission.replace(':', "-"));
    let body = json!({ "name": role_name, "permissions": [perm_id] });
    let response = post_json_auth(build_test_app(pool.clone()), "/api/iam/roles", admin_token, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let role_id = body_json(response).await["id"].clone();

    let body = json!({ "email": email, "password": STRONG_PASSWORD, "role_ids": [role_id] });
    let response = post_json_auth(build_test_app(pool.clone()), "/api/iam/users", admin_token, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let user = body_json(response).await;

    let token = login(pool, email, STRONG_PASSWORD).await;
    (token, user)
}

/// Log in and return the bearer token. Panics unless the login succeeds.
pub async fn login(pool: &PgPool, email: &str, password: &str) -> String {
    let body = json!({ "email": email, "password": password });
    let response = post_json(build_test_app(pool.clone()), "/api/login", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["token"].as_str().unwrap().to_string()
}
