//! Parser for Stripe-shaped webhook payloads.
//!
//! Stripe wraps the subject in `data.object`; the customer email lives in
//! `customer_email` or nested `customer_details.email` depending on the
//! object type, and the price id sits in the first subscription item.

use serde::Deserialize;

use abrahub_core::plan::plan_for_price_id;

use crate::event::{BillingEvent, BillingProvider, BillingStatus};
use crate::BillingError;

/// Subscription statuses Stripe reports that we treat as paid.
const PAID_STATUSES: &[&str] = &["active", "trialing"];

/// Statuses where Stripe is still retrying payment; these start the grace
/// window rather than revoking access outright.
const GRACE_STATUSES: &[&str] = &["past_due", "unpaid"];

#[derive(Debug, Deserialize)]
struct RawStripeEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: RawObject,
}

#[derive(Debug, Deserialize)]
struct RawObject {
    customer_email: Option<String>,
    customer_details: Option<RawCustomerDetails>,
    customer: Option<String>,
    status: Option<String>,
    items: Option<RawItems>,
}

#[derive(Debug, Deserialize)]
struct RawCustomerDetails {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawItems {
    data: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    price: Option<RawPrice>,
}

#[derive(Debug, Deserialize)]
struct RawPrice {
    id: String,
}

/// Parse a Stripe webhook body into a canonical [`BillingEvent`].
pub fn parse(payload: &[u8]) -> Result<BillingEvent, BillingError> {
    let raw: RawStripeEvent =
        serde_json::from_slice(payload).map_err(|e| BillingError::Malformed(e.to_string()))?;

    let object = raw.data.object;

    let email = object
        .customer_email
        .or_else(|| object.customer_details.and_then(|d| d.email))
        .ok_or_else(|| {
            BillingError::Unhandled(format!("{}: no customer email", raw.event_type))
        })?;

    let raw_status = object.status.unwrap_or_else(|| "unknown".into());

    let status = match raw.event_type.as_str() {
        "customer.subscription.created" | "customer.subscription.updated" => {
            if PAID_STATUSES.contains(&raw_status.as_str()) {
                BillingStatus::Paid
            } else if GRACE_STATUSES.contains(&raw_status.as_str()) {
                BillingStatus::Grace { raw: raw_status }
            } else {
                BillingStatus::Revoked { raw: raw_status }
            }
        }
        "customer.subscription.deleted" => BillingStatus::Revoked { raw: raw_status },
        "checkout.session.completed" | "invoice.paid" => BillingStatus::Paid,
        // Stripe keeps retrying a failed invoice and reports the outcome on
        // the subscription (past_due/unpaid/canceled), so a bounced card
        // starts the grace window rather than blocking outright.
        "invoice.payment_failed" => BillingStatus::Grace {
            raw: format!("{raw_status} ({})", raw.event_type),
        },
        "charge.refunded" | "charge.dispute.created" => BillingStatus::Revoked {
            raw: format!("{raw_status} ({})", raw.event_type),
        },
        other => return Err(BillingError::Unhandled(other.to_string())),
    };

    let plan = object
        .items
        .and_then(|items| items.data.into_iter().next())
        .and_then(|item| item.price)
        .and_then(|price| plan_for_price_id(&price.id));

    Ok(BillingEvent {
        account_email: email.trim().to_lowercase(),
        status,
        plan,
        provider: BillingProvider::Stripe,
        customer_id: object.customer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use abrahub_core::plan::Plan;
    use assert_matches::assert_matches;

    fn subscription_payload(event_type: &str, status: &str) -> Vec<u8> {
        serde_json::json!({
            "id": "evt_1",
            "type": event_type,
            "data": {
                "object": {
                    "customer": "cus_123",
                    "customer_email": "X@Example.com",
                    "status": status,
                    "items": {
                        "data": [
                            { "price": { "id": "price_abrahub_pro_monthly" } }
                        ]
                    }
                }
            }
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn active_subscription_normalizes_to_paid() {
        let event = parse(&subscription_payload("customer.subscription.updated", "active"))
            .unwrap();
        assert_eq!(event.account_email, "x@example.com");
        assert_eq!(event.status, BillingStatus::Paid);
        assert_eq!(event.plan, Some(Plan::Pro));
        assert_eq!(event.provider, BillingProvider::Stripe);
    }

    #[test]
    fn past_due_subscription_starts_grace_not_revocation() {
        let event = parse(&subscription_payload("customer.subscription.updated", "past_due"))
            .unwrap();
        assert_matches!(event.status, BillingStatus::Grace { ref raw } if raw == "past_due");
        assert_eq!(event.blocked_reason(), None);
    }

    #[test]
    fn failed_invoice_starts_grace_not_revocation() {
        let body = serde_json::json!({
            "type": "invoice.payment_failed",
            "data": {
                "object": {
                    "customer": "cus_123",
                    "customer_email": "late@example.com",
                    "status": "open"
                }
            }
        })
        .to_string();
        let event = parse(body.as_bytes()).unwrap();
        assert_matches!(
            event.status,
            BillingStatus::Grace { ref raw } if raw == "open (invoice.payment_failed)"
        );
        assert_eq!(event.blocked_reason(), None);
    }

    #[test]
    fn deleted_subscription_is_revoked_with_raw_status() {
        let event = parse(&subscription_payload("customer.subscription.deleted", "canceled"))
            .unwrap();
        assert_matches!(event.status, BillingStatus::Revoked { ref raw } if raw == "canceled");
        assert_eq!(event.blocked_reason().unwrap(), "stripe: canceled");
    }

    #[test]
    fn nested_customer_details_email_is_honored() {
        let body = serde_json::json!({
            "type": "checkout.session.completed",
            "data": {
                "object": {
                    "customer": "cus_9",
                    "customer_details": { "email": "nested@example.com" }
                }
            }
        })
        .to_string();
        let event = parse(body.as_bytes()).unwrap();
        assert_eq!(event.account_email, "nested@example.com");
        assert_eq!(event.status, BillingStatus::Paid);
    }

    #[test]
    fn missing_email_is_unhandled_not_malformed() {
        let body = serde_json::json!({
            "type": "invoice.paid",
            "data": { "object": {} }
        })
        .to_string();
        assert_matches!(parse(body.as_bytes()), Err(BillingError::Unhandled(_)));
    }

    #[test]
    fn garbage_body_is_malformed() {
        assert_matches!(parse(b"not json"), Err(BillingError::Malformed(_)));
    }
}
