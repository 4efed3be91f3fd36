//! Canonical billing event shared by every provider parser.

use abrahub_core::plan::Plan;

/// Which provider delivered the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingProvider {
    Stripe,
    Kiwify,
}

impl BillingProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            BillingProvider::Stripe => "stripe",
            BillingProvider::Kiwify => "kiwify",
        }
    }
}

/// Normalized billing outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingStatus {
    /// Subscription active / payment settled.
    Paid,
    /// Payment lapsed but the provider is still retrying (e.g. Stripe
    /// `past_due`). Starts the grace window instead of revoking.
    Grace { raw: String },
    /// Refund, chargeback, or cancellation. Carries the provider's raw
    /// status string for the blocked-reason audit trail.
    Revoked { raw: String },
}

/// One billing event after boundary normalization. All reconciler logic
/// operates on this type only.
#[derive(Debug, Clone)]
pub struct BillingEvent {
    /// Customer email, lower-cased.
    pub account_email: String,
    pub status: BillingStatus,
    /// Internal plan resolved from the provider's price/product id.
    /// `None` when the identifier is unknown (logged and treated as no
    /// plan change, but whitelist status still applies).
    pub plan: Option<Plan>,
    pub provider: BillingProvider,
    /// Provider-side customer id, when the payload carries one.
    pub customer_id: Option<String>,
}

impl BillingEvent {
    /// Blocked-reason string recorded on revocation, e.g.
    /// `"kiwify: chargedback"`.
    pub fn blocked_reason(&self) -> Option<String> {
        match &self.status {
            BillingStatus::Paid | BillingStatus::Grace { .. } => None,
            BillingStatus::Revoked { raw } => {
                Some(format!("{}: {}", self.provider.as_str(), raw))
            }
        }
    }
}
