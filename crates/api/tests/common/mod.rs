#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use abrahub_api::auth::jwt::{generate_access_token, JwtConfig};
use abrahub_api::auth::password::hash_password;
use abrahub_api::config::ServerConfig;
use abrahub_api::router::build_app_router;
use abrahub_api::signal::QueueSignal;
use abrahub_api::state::AppState;
use abrahub_core::plan::MeteringPolicy;
use abrahub_db::models::user::{User, ROLE_ADMIN, ROLE_USER};
use abrahub_db::repositories::{UserRepo, WhitelistRepo};
use abrahub_provider::ProviderClient;

/// Build a test `ServerConfig` with safe defaults.
///
/// Webhook signature verification and the provider lookup are disabled
/// (empty secrets), matching a local environment; metering is off.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 60,
        },
        provider_url: "http://localhost:8787".to_string(),
        provider_api_key: String::new(),
        provider_model_label: "abra-cinema-v1".to_string(),
        image_root: std::env::temp_dir().join("abrahub-test-images"),
        stripe_webhook_secret: String::new(),
        stripe_api_url: "https://api.stripe.com".to_string(),
        stripe_api_key: String::new(),
        kiwify_webhook_secret: String::new(),
        metering: MeteringPolicy { enabled: false },
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
///
/// Mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack that production uses. The queue
/// processor is NOT running; admitted jobs stay `queued`.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_config(pool, test_config())
}

/// Like [`build_test_app`] but with a caller-adjusted config (e.g. metering
/// switched on).
pub fn build_test_app_with_config(pool: PgPool, config: ServerConfig) -> Router {
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        queue_signal: Arc::new(QueueSignal::new()),
        provider: Arc::new(ProviderClient::new(
            config.provider_url.clone(),
            config.provider_api_key.clone(),
            config.provider_model_label.clone(),
        )),
    };
    build_app_router(state, &config)
}

/// Create a whitelisted test user directly in the database and return the
/// user row, the plaintext password, and a valid access token.
pub async fn create_test_user(pool: &PgPool, email: &str) -> (User, String, String) {
    let password = "correct-horse-battery";
    WhitelistRepo::upsert_status(pool, email, "active", None)
        .await
        .expect("whitelist upsert should succeed");
    let hashed = hash_password(password).expect("hashing should succeed");
    let user = UserRepo::create(pool, email, &hashed, ROLE_USER)
        .await
        .expect("user creation should succeed");
    let token = generate_access_token(user.id, &user.role, &test_config().jwt)
        .expect("token generation should succeed");
    (user, password.to_string(), token)
}

/// Create an admin user (not whitelisted; admins are provisioned by hand)
/// and return the user row plus a valid access token.
pub async fn create_admin_user(pool: &PgPool, email: &str) -> (User, String) {
    let hashed = hash_password("admin-password-long").expect("hashing should succeed");
    let user = UserRepo::create(pool, email, &hashed, ROLE_ADMIN)
        .await
        .expect("admin creation should succeed");
    let token = generate_access_token(user.id, &user.role, &test_config().jwt)
        .expect("token generation should succeed");
    (user, token)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("GET")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response body should be valid JSON")
}

/// Assert the response status, with the body in the panic message when it
/// does not match.
pub async fn assert_status(response: Response<Body>, expected: StatusCode) -> serde_json::Value {
    let status = response.status();
    let json = body_json(response).await;
    assert_eq!(status, expected, "unexpected status, body: {json}");
    json
}
