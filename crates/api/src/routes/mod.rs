pub mod auth;
pub mod billing;
pub mod health;
pub mod queue;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/signup                        create account (public, whitelisted emails only)
/// /auth/login                         login (public)
///
/// /queue                              submit job (POST), queue overview (GET)
/// /queue/{id}                         job status (GET), cancel (DELETE)
///
/// /billing/webhooks/stripe            Stripe webhook (public, signed)
/// /billing/webhooks/kiwify            Kiwify webhook (public, signed)
/// /billing/subscription               subscription status (auth)
/// /billing/plans                      plan table (public)
/// /billing/grant                      manual credit grant (admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/queue", queue::router())
        .nest("/billing", billing::router())
}
