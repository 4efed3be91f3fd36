//! Billing-provider boundary layer.
//!
//! Two payment providers deliver webhooks with different payload shapes:
//! Stripe nests the subject under `data.object`, the alternate provider
//! (Kiwify) sends PascalCase `Customer`/`Product`/`Subscription` blocks.
//! Both are normalized here into one canonical [`BillingEvent`] before any
//! entitlement or wallet logic runs, so the reconciler never sees
//! provider-specific structure.

pub mod event;
pub mod kiwify;
pub mod signature;
pub mod stripe;
pub mod subscription;

pub use event::{BillingEvent, BillingProvider, BillingStatus};

/// Errors from webhook parsing and verification.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("Webhook signature verification failed: {0}")]
    Signature(String),

    #[error("Malformed webhook payload: {0}")]
    Malformed(String),

    /// Parsed fine but carries nothing actionable (no email, unknown
    /// event type). Acknowledged with 200 and skipped.
    #[error("Unhandled webhook event: {0}")]
    Unhandled(String),

    /// Pull-model provider API call failed (network, non-2xx, bad body).
    #[error("Provider API error: {0}")]
    Provider(String),
}
