//! Billing webhook handlers and the entitlement reconciler.
//!
//! Webhook bodies are taken raw (`Bytes`) so signatures verify over the
//! exact payload, then parsed by the provider-specific module in
//! `abrahub_billing` into one canonical [`BillingEvent`]. Everything past
//! that point is provider-agnostic.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use abrahub_billing::{kiwify, signature, stripe, BillingError, BillingEvent, BillingStatus};
use abrahub_core::plan::Plan;
use abrahub_core::types::DbId;
use abrahub_db::models::credit::reason;
use abrahub_db::models::whitelist::status as wl_status;
use abrahub_db::repositories::{CreditRepo, EntitlementRepo, UserRepo, WhitelistRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AdminUser, AuthUser};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub applied: bool,
}

// ---------------------------------------------------------------------------
// Webhooks
// ---------------------------------------------------------------------------

/// POST /api/v1/billing/webhooks/stripe
///
/// Stripe-shaped payloads, signed via the `Stripe-Signature` header.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let secret = &state.config.stripe_webhook_secret;
    if !secret.is_empty() {
        let header = headers
            .get("stripe-signature")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::BadRequest("Missing Stripe-Signature header".into()))?;
        signature::verify_stripe(&body, header, secret, chrono::Utc::now().timestamp())
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
    }

    let event = match stripe::parse(&body) {
        Ok(event) => event,
        Err(BillingError::Unhandled(what)) => {
            // Not ours to act on; acknowledge so the provider stops retrying.
            tracing::debug!(what, "Skipping unhandled Stripe event");
            return Ok(Json(WebhookAck {
                received: true,
                applied: false,
            }));
        }
        Err(e) => return Err(AppError::BadRequest(e.to_string())),
    };

    apply_billing_event(&state.pool, &event).await?;
    Ok(Json(WebhookAck {
        received: true,
        applied: true,
    }))
}

#[derive(Debug, Deserialize)]
pub struct KiwifyParams {
    pub signature: Option<String>,
}

/// POST /api/v1/billing/webhooks/kiwify
///
/// Kiwify-shaped payloads, signed via a `?signature=` hex HMAC of the body.
pub async fn kiwify_webhook(
    State(state): State<AppState>,
    Query(params): Query<KiwifyParams>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let secret = &state.config.kiwify_webhook_secret;
    if !secret.is_empty() {
        let sig = params
            .signature
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("Missing signature parameter".into()))?;
        signature::verify_hex_hmac(&body, sig, secret)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
    }

    let event = match kiwify::parse(&body) {
        Ok(event) => event,
        Err(BillingError::Unhandled(what)) => {
            tracing::debug!(what, "Skipping unhandled Kiwify event");
            return Ok(Json(WebhookAck {
                received: true,
                applied: false,
            }));
        }
        Err(e) => return Err(AppError::BadRequest(e.to_string())),
    };

    apply_billing_event(&state.pool, &event).await?;
    Ok(Json(WebhookAck {
        received: true,
        applied: true,
    }))
}

/// Reconcile one normalized billing event into whitelist, entitlement, and
/// wallet state.
///
/// The whitelist upsert always runs, even when no account exists yet — a
/// later signup by that email must pass the gate. Entitlement and wallet
/// mutations only happen for existing accounts.
pub async fn apply_billing_event(pool: &PgPool, event: &BillingEvent) -> AppResult<()> {
    let whitelist_status = match event.status {
        // Grace keeps the whitelist open; the sweep revisits it later.
        BillingStatus::Paid | BillingStatus::Grace { .. } => wl_status::ACTIVE,
        BillingStatus::Revoked { .. } => wl_status::INACTIVE,
    };
    WhitelistRepo::upsert_status(
        pool,
        &event.account_email,
        whitelist_status,
        event.customer_id.as_deref(),
    )
    .await?;

    let Some(user) = UserRepo::find_by_email(pool, &event.account_email).await? else {
        tracing::info!(
            provider = event.provider.as_str(),
            "Billing event for email with no account yet; whitelist updated only",
        );
        return Ok(());
    };

    match &event.status {
        BillingStatus::Paid => {
            let Some(plan) = event.plan else {
                tracing::warn!(
                    account_id = user.id,
                    provider = event.provider.as_str(),
                    "Paid event with unknown plan identifier; entitlement unchanged",
                );
                return Ok(());
            };

            EntitlementRepo::upsert_active(pool, user.id, plan.as_str(), None).await?;

            let allowance = plan.monthly_allowance();
            CreditRepo::set_allowance(pool, user.id, allowance).await?;
            CreditRepo::set_balance(
                pool,
                user.id,
                allowance,
                reason::BILLING_RESET,
                Some(event.provider.as_str()),
            )
            .await?;

            tracing::info!(
                account_id = user.id,
                plan = plan.as_str(),
                allowance,
                "Entitlement activated from billing event",
            );
        }
        BillingStatus::Grace { raw } => {
            // Keep plan and balance; the expiration sweep downgrades the
            // account if the provider never recovers the payment.
            let grace_until =
                chrono::Utc::now() + chrono::Duration::days(abrahub_core::plan::GRACE_PERIOD_DAYS);
            EntitlementRepo::start_grace(pool, user.id, grace_until).await?;

            tracing::warn!(
                account_id = user.id,
                raw_status = raw.as_str(),
                %grace_until,
                "Payment lapsed, grace period started",
            );
        }
        BillingStatus::Revoked { .. } => {
            // No grace period for refunds/chargebacks: block and zero
            // immediately.
            let blocked_reason = event
                .blocked_reason()
                .unwrap_or_else(|| event.provider.as_str().to_string());
            EntitlementRepo::mark_inactive_blocked(pool, user.id, &blocked_reason).await?;
            CreditRepo::set_allowance(pool, user.id, 0).await?;
            CreditRepo::set_balance(
                pool,
                user.id,
                0,
                reason::BILLING_REVOKED,
                Some(event.provider.as_str()),
            )
            .await?;

            tracing::warn!(
                account_id = user.id,
                blocked_reason,
                "Account blocked from billing event",
            );
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Pull-model subscription check
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct SubscriptionStatusResponse {
    pub plan: String,
    pub status: String,
    pub monthly_allowance: i64,
    pub is_blocked: bool,
}

/// GET /api/v1/billing/subscription
///
/// Re-derive the caller's entitlement from the billing provider's current
/// view. Updates plan and status only; the wallet is never credited here —
/// a status poll must not double-credit what the webhook already granted.
pub async fn subscription_status(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or(AppError::Core(abrahub_core::error::CoreError::NotFound {
            entity: "User",
            id: auth.user_id,
        }))?;

    // The provider lookup keys off the whitelist's stored customer id; an
    // account that never hit a paid webhook has nothing to pull.
    let whitelist = WhitelistRepo::find_by_email(&state.pool, &user.email).await?;

    if let Some(wl) = whitelist.filter(|_| !state.config.stripe_api_key.is_empty()) {
        if let Some(customer_id) = wl.stripe_customer_id.as_deref() {
            match abrahub_billing::subscription::fetch_active_plan(
                &state.config.stripe_api_url,
                &state.config.stripe_api_key,
                customer_id,
            )
            .await
            {
                Ok(Some(lookup)) => {
                    let plan = lookup
                        .plan
                        .map(|p| p.as_str().to_string())
                        .unwrap_or_else(|| "free".to_string());
                    EntitlementRepo::upsert_plan(
                        &state.pool,
                        user.id,
                        &plan,
                        &lookup.status,
                        lookup.current_period_end,
                    )
                    .await?;
                }
                Ok(None) => {
                    tracing::debug!(account_id = user.id, "No active provider subscription");
                }
                Err(e) => {
                    // A provider outage must not break the status check;
                    // serve the stored entitlement.
                    tracing::warn!(account_id = user.id, error = %e, "Provider lookup failed");
                }
            }
        }
    }

    let entitlement = EntitlementRepo::find_by_account(&state.pool, user.id).await?;
    let wallet = CreditRepo::find_wallet(&state.pool, user.id).await?;

    let (plan, status, is_blocked) = entitlement
        .map(|e| (e.plan, e.status, e.is_blocked))
        .unwrap_or_else(|| ("free".into(), "inactive".into(), false));

    Ok(Json(DataResponse {
        data: SubscriptionStatusResponse {
            monthly_allowance: wallet.map(|w| w.monthly_allowance).unwrap_or(0),
            plan,
            status,
            is_blocked,
        },
    }))
}

// ---------------------------------------------------------------------------
// Admin grant
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    pub account_id: DbId,
    pub credits: i64,
    /// Optional note stored on the ledger row.
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GrantResponse {
    pub account_id: DbId,
    pub balance: i64,
}

/// POST /api/v1/billing/grant
///
/// Manually credit an account. Admin only. Recorded as an `admin_grant`
/// ledger entry; the target's blocked flag is respected.
pub async fn grant_credits(
    admin: AdminUser,
    State(state): State<AppState>,
    Json(input): Json<GrantRequest>,
) -> AppResult<impl IntoResponse> {
    if input.credits <= 0 {
        return Err(AppError::BadRequest("credits must be positive".into()));
    }

    super::ensure_not_blocked(&state.pool, input.account_id).await?;

    let balance = CreditRepo::apply(
        &state.pool,
        input.account_id,
        input.credits,
        reason::ADMIN_GRANT,
        input.note.as_deref(),
    )
    .await?;

    tracing::info!(
        account_id = input.account_id,
        credits = input.credits,
        granted_by = admin.0.user_id,
        "Manual credit grant",
    );

    Ok(Json(DataResponse {
        data: GrantResponse {
            account_id: input.account_id,
            balance,
        },
    }))
}

#[derive(Debug, Serialize)]
pub struct PlanInfo {
    pub plan: &'static str,
    pub monthly_allowance: i64,
}

/// GET /api/v1/billing/plans
///
/// The static plan table, for the client's pricing display.
pub async fn list_plans() -> Json<DataResponse<Vec<PlanInfo>>> {
    let plans = [Plan::Free, Plan::Pro, Plan::ProPlus, Plan::Community]
        .into_iter()
        .map(|p| PlanInfo {
            plan: p.as_str(),
            monthly_allowance: p.monthly_allowance(),
        })
        .collect();
    Json(DataResponse { data: plans })
}
