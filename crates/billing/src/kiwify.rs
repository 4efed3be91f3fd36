//! Parser for the alternate provider's (Kiwify) webhook payloads.
//!
//! PascalCase top-level blocks: `Customer` (email), `Product` (plan name),
//! `Subscription`, plus a snake_case `order_status` string.

use serde::Deserialize;

use abrahub_core::plan::plan_for_price_id;

use crate::event::{BillingEvent, BillingProvider, BillingStatus};
use crate::BillingError;

/// Order statuses treated as settled payment.
const PAID_STATUSES: &[&str] = &["paid", "approved"];

/// Statuses where the provider is still collecting payment.
const GRACE_STATUSES: &[&str] = &["waiting_payment", "past_due"];

#[derive(Debug, Deserialize)]
struct RawKiwifyEvent {
    order_status: Option<String>,
    #[serde(rename = "Customer")]
    customer: Option<RawCustomer>,
    #[serde(rename = "Product")]
    product: Option<RawProduct>,
    #[serde(rename = "Subscription")]
    subscription: Option<RawSubscription>,
}

#[derive(Debug, Deserialize)]
struct RawCustomer {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawProduct {
    product_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSubscription {
    status: Option<String>,
}

/// Parse a Kiwify webhook body into a canonical [`BillingEvent`].
pub fn parse(payload: &[u8]) -> Result<BillingEvent, BillingError> {
    let raw: RawKiwifyEvent =
        serde_json::from_slice(payload).map_err(|e| BillingError::Malformed(e.to_string()))?;

    let email = raw
        .customer
        .and_then(|c| c.email)
        .ok_or_else(|| BillingError::Unhandled("no Customer.email".into()))?;

    // order_status is authoritative; the Subscription block's status is a
    // fallback for subscription-renewal events that omit it.
    let raw_status = raw
        .order_status
        .or_else(|| raw.subscription.and_then(|s| s.status))
        .ok_or_else(|| BillingError::Unhandled("no order_status".into()))?;

    let status = if PAID_STATUSES.contains(&raw_status.as_str()) {
        BillingStatus::Paid
    } else if GRACE_STATUSES.contains(&raw_status.as_str()) {
        BillingStatus::Grace { raw: raw_status }
    } else {
        BillingStatus::Revoked { raw: raw_status }
    };

    let plan = raw
        .product
        .and_then(|p| p.product_name)
        .and_then(|name| plan_for_price_id(&name));

    Ok(BillingEvent {
        account_email: email.trim().to_lowercase(),
        status,
        plan,
        provider: BillingProvider::Kiwify,
        customer_id: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use abrahub_core::plan::Plan;
    use assert_matches::assert_matches;

    fn payload(order_status: &str) -> Vec<u8> {
        serde_json::json!({
            "order_id": "abc123",
            "order_status": order_status,
            "Customer": { "email": "Member@Example.COM", "full_name": "M" },
            "Product": { "product_name": "ABRAhub Comunidade" },
            "Subscription": { "status": "active" }
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn paid_order_maps_to_community_plan() {
        let event = parse(&payload("paid")).unwrap();
        assert_eq!(event.account_email, "member@example.com");
        assert_eq!(event.status, BillingStatus::Paid);
        assert_eq!(event.plan, Some(Plan::Community));
        assert_eq!(event.provider, BillingProvider::Kiwify);
    }

    #[test]
    fn chargeback_is_revoked_with_provider_and_raw_status() {
        let event = parse(&payload("chargedback")).unwrap();
        assert_matches!(event.status, BillingStatus::Revoked { ref raw } if raw == "chargedback");
        assert_eq!(event.blocked_reason().unwrap(), "kiwify: chargedback");
    }

    #[test]
    fn waiting_payment_starts_grace() {
        let event = parse(&payload("waiting_payment")).unwrap();
        assert_matches!(event.status, BillingStatus::Grace { .. });
    }

    #[test]
    fn refunded_is_revoked() {
        let event = parse(&payload("refunded")).unwrap();
        assert_matches!(event.status, BillingStatus::Revoked { .. });
    }

    #[test]
    fn missing_customer_email_is_unhandled() {
        let body = serde_json::json!({ "order_status": "paid" }).to_string();
        assert_matches!(parse(body.as_bytes()), Err(BillingError::Unhandled(_)));
    }
}
