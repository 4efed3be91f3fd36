//! Route definitions for billing webhooks and entitlement queries.
//!
//! Webhooks are unauthenticated HTTP-wise; their authenticity comes from
//! the HMAC signature checked inside the handlers.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::billing;
use crate::state::AppState;

/// Routes mounted at `/billing`.
///
/// ```text
/// POST /webhooks/stripe  -> stripe_webhook  (signed, public)
/// POST /webhooks/kiwify  -> kiwify_webhook  (signed, public)
/// GET  /subscription     -> subscription_status (auth)
/// GET  /plans            -> list_plans (public)
/// POST /grant            -> grant_credits (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhooks/stripe", post(billing::stripe_webhook))
        .route("/webhooks/kiwify", post(billing::kiwify_webhook))
        .route("/subscription", get(billing::subscription_status))
        .route("/plans", get(billing::list_plans))
        .route("/grant", post(billing::grant_credits))
}
