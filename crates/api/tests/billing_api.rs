//! HTTP-level integration tests for billing webhooks and the entitlement
//! reconciler.
//!
//! Signature verification is disabled in the test config (empty secrets),
//! so these tests exercise parsing, normalization, and reconciliation.

mod common;

use axum::http::StatusCode;
use sqlx::PgPool;

use abrahub_core::plan::PRO_MONTHLY_CREDITS;
use abrahub_db::repositories::{CreditRepo, EntitlementRepo, WhitelistRepo};

fn stripe_paid_payload(email: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "evt_test",
        "type": "customer.subscription.updated",
        "data": {
            "object": {
                "customer": "cus_test",
                "customer_email": email,
                "status": "active",
                "items": {
                    "data": [
                        { "price": { "id": "price_abrahub_pro_monthly" } }
                    ]
                }
            }
        }
    })
}

fn stripe_refund_payload(email: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "evt_refund",
        "type": "charge.refunded",
        "data": {
            "object": {
                "customer": "cus_test",
                "customer_email": email,
                "status": "succeeded"
            }
        }
    })
}

/// A paid subscription event activates the entitlement and resets the
/// wallet to the plan allowance.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_paid_event_activates_and_credits(pool: PgPool) {
    let (user, _pw, _token) = common::create_test_user(&pool, "payer@example.com").await;
    let app = common::build_test_app(pool.clone());

    let response = common::post_json(
        app,
        "/api/v1/billing/webhooks/stripe",
        stripe_paid_payload(&user.email),
    )
    .await;
    let json = common::assert_status(response, StatusCode::OK).await;
    assert_eq!(json["applied"], true);

    let entitlement = EntitlementRepo::find_by_account(&pool, user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entitlement.plan, "pro");
    assert_eq!(entitlement.status, "active");
    assert!(!entitlement.is_blocked);

    let wallet = CreditRepo::find_wallet(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(wallet.balance, PRO_MONTHLY_CREDITS);
    assert_eq!(wallet.monthly_allowance, PRO_MONTHLY_CREDITS);

    // Customer id captured for the pull-model lookup.
    let wl = WhitelistRepo::find_by_email(&pool, &user.email)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(wl.stripe_customer_id.as_deref(), Some("cus_test"));
}

/// Replaying the same paid event is harmless: the ledger records a zero
/// net change and the balance stays at the allowance.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_paid_event_replay_does_not_double_credit(pool: PgPool) {
    let (user, _pw, _token) = common::create_test_user(&pool, "replay@example.com").await;

    for _ in 0..2 {
        let app = common::build_test_app(pool.clone());
        let response = common::post_json(
            app,
            "/api/v1/billing/webhooks/stripe",
            stripe_paid_payload(&user.email),
        )
        .await;
        common::assert_status(response, StatusCode::OK).await;
    }

    let wallet = CreditRepo::find_wallet(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(wallet.balance, PRO_MONTHLY_CREDITS);
}

/// A refund blocks the account and zeroes the wallet.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_refund_blocks_and_zeroes(pool: PgPool) {
    let (user, _pw, _token) = common::create_test_user(&pool, "refunded@example.com").await;

    let app = common::build_test_app(pool.clone());
    let response = common::post_json(
        app,
        "/api/v1/billing/webhooks/stripe",
        stripe_paid_payload(&user.email),
    )
    .await;
    common::assert_status(response, StatusCode::OK).await;

    let app = common::build_test_app(pool.clone());
    let response = common::post_json(
        app,
        "/api/v1/billing/webhooks/stripe",
        stripe_refund_payload(&user.email),
    )
    .await;
    common::assert_status(response, StatusCode::OK).await;

    let entitlement = EntitlementRepo::find_by_account(&pool, user.id)
        .await
        .unwrap()
        .unwrap();
    assert!(entitlement.is_blocked);
    assert_eq!(
        entitlement.blocked_reason.as_deref(),
        Some("stripe: succeeded (charge.refunded)")
    );

    let wallet = CreditRepo::find_wallet(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(wallet.balance, 0);
    assert_eq!(wallet.monthly_allowance, 0);

    // The whitelist row is revoked too, so re-signup is gated.
    assert!(!WhitelistRepo::is_active(&pool, &user.email).await.unwrap());
}

/// A past-due subscription starts the grace window without touching the
/// wallet or the whitelist.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_past_due_starts_grace(pool: PgPool) {
    let (user, _pw, _token) = common::create_test_user(&pool, "grace@example.com").await;

    let app = common::build_test_app(pool.clone());
    let response = common::post_json(
        app,
        "/api/v1/billing/webhooks/stripe",
        stripe_paid_payload(&user.email),
    )
    .await;
    common::assert_status(response, StatusCode::OK).await;

    let mut payload = stripe_paid_payload(&user.email);
    payload["data"]["object"]["status"] = serde_json::json!("past_due");
    let app = common::build_test_app(pool.clone());
    let response = common::post_json(app, "/api/v1/billing/webhooks/stripe", payload).await;
    common::assert_status(response, StatusCode::OK).await;

    let entitlement = EntitlementRepo::find_by_account(&pool, user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entitlement.status, "past_due");
    assert!(entitlement.grace_until.is_some());
    assert!(!entitlement.is_blocked);
    assert_eq!(entitlement.plan, "pro");

    // Balance survives until the sweep.
    let wallet = CreditRepo::find_wallet(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(wallet.balance, PRO_MONTHLY_CREDITS);
    assert!(WhitelistRepo::is_active(&pool, &user.email).await.unwrap());
}

/// A paid event for an email with no account yet still whitelists it, so
/// the later signup passes the gate.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_paid_event_before_signup_whitelists_email(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let response = common::post_json(
        app,
        "/api/v1/billing/webhooks/stripe",
        stripe_paid_payload("early@example.com"),
    )
    .await;
    common::assert_status(response, StatusCode::OK).await;

    assert!(WhitelistRepo::is_active(&pool, "early@example.com")
        .await
        .unwrap());

    let app = common::build_test_app(pool);
    let body = serde_json::json!({
        "email": "early@example.com",
        "password": "correct-horse-battery",
    });
    let response = common::post_json(app, "/api/v1/auth/signup", body).await;
    common::assert_status(response, StatusCode::CREATED).await;
}

/// Event types outside the handled set are acknowledged without effect, so
/// the provider stops retrying them.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_unhandled_event_acked_not_applied(pool: PgPool) {
    let app = common::build_test_app(pool);

    let body = serde_json::json!({
        "id": "evt_x",
        "type": "customer.updated",
        "data": { "object": { "customer_email": "whoever@example.com" } }
    });
    let response = common::post_json(app, "/api/v1/billing/webhooks/stripe", body).await;
    let json = common::assert_status(response, StatusCode::OK).await;
    assert_eq!(json["received"], true);
    assert_eq!(json["applied"], false);
}

/// Garbage payloads are a client error, not a server error.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_malformed_payload_is_bad_request(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = common::post_json(
        app,
        "/api/v1/billing/webhooks/stripe",
        serde_json::json!({ "not": "a stripe event" }),
    )
    .await;
    common::assert_status(response, StatusCode::BAD_REQUEST).await;
}

/// Kiwify payloads reconcile through the same path.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_kiwify_paid_event(pool: PgPool) {
    let (user, _pw, _token) = common::create_test_user(&pool, "kiwi@example.com").await;
    let app = common::build_test_app(pool.clone());

    let body = serde_json::json!({
        "order_id": "k1",
        "order_status": "paid",
        "Customer": { "email": user.email },
        "Product": { "product_name": "ABRAhub Comunidade" }
    });
    let response = common::post_json(app, "/api/v1/billing/webhooks/kiwify", body).await;
    let json = common::assert_status(response, StatusCode::OK).await;
    assert_eq!(json["applied"], true);

    let entitlement = EntitlementRepo::find_by_account(&pool, user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entitlement.plan, "community");
}

/// Credit grants are admin-only and land in the wallet.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_grant_requires_admin(pool: PgPool) {
    let (user, _pw, user_token) = common::create_test_user(&pool, "grantee@example.com").await;
    let (_admin, admin_token) = common::create_admin_user(&pool, "root@example.com").await;

    let body = serde_json::json!({ "account_id": user.id, "credits": 25 });

    let app = common::build_test_app(pool.clone());
    let response =
        common::post_json_auth(app, "/api/v1/billing/grant", &user_token, body.clone()).await;
    common::assert_status(response, StatusCode::FORBIDDEN).await;

    let app = common::build_test_app(pool.clone());
    let response =
        common::post_json_auth(app, "/api/v1/billing/grant", &admin_token, body).await;
    let json = common::assert_status(response, StatusCode::OK).await;
    assert_eq!(json["data"]["balance"], 25);

    let wallet = CreditRepo::find_wallet(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(wallet.balance, 25);
}

/// The subscription status endpoint serves the stored entitlement when the
/// provider lookup is disabled.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_subscription_status_serves_stored_entitlement(pool: PgPool) {
    let (user, _pw, token) = common::create_test_user(&pool, "status@example.com").await;

    let app = common::build_test_app(pool.clone());
    let response = common::post_json(
        app,
        "/api/v1/billing/webhooks/stripe",
        stripe_paid_payload(&user.email),
    )
    .await;
    common::assert_status(response, StatusCode::OK).await;

    let app = common::build_test_app(pool);
    let response = common::get_auth(app, "/api/v1/billing/subscription", &token).await;
    let json = common::assert_status(response, StatusCode::OK).await;

    assert_eq!(json["data"]["plan"], "pro");
    assert_eq!(json["data"]["status"], "active");
    assert_eq!(json["data"]["is_blocked"], false);
    assert_eq!(json["data"]["monthly_allowance"], PRO_MONTHLY_CREDITS);
}
