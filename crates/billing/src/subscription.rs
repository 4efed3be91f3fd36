//! Pull-model subscription lookup against the Stripe REST API.
//!
//! Used by the subscription status endpoint to re-derive an entitlement on
//! demand instead of waiting for the next webhook. Only ever reads; the
//! caller decides what to persist.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use abrahub_core::plan::{plan_for_price_id, Plan};

use crate::BillingError;

/// The provider's current view of one customer's subscription.
#[derive(Debug, Clone)]
pub struct SubscriptionLookup {
    pub plan: Option<Plan>,
    /// Raw provider status string (`active`, `past_due`, ...).
    pub status: String,
    pub current_period_end: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct SubscriptionList {
    data: Vec<Subscription>,
}

#[derive(Deserialize)]
struct Subscription {
    status: String,
    current_period_end: Option<i64>,
    items: SubscriptionItems,
}

#[derive(Deserialize)]
struct SubscriptionItems {
    data: Vec<SubscriptionItem>,
}

#[derive(Deserialize)]
struct SubscriptionItem {
    price: Price,
}

#[derive(Deserialize)]
struct Price {
    id: String,
}

/// Fetch the customer's most relevant subscription, or `None` when the
/// customer has no non-canceled subscription at all.
pub async fn fetch_active_plan(
    api_url: &str,
    api_key: &str,
    customer_id: &str,
) -> Result<Option<SubscriptionLookup>, BillingError> {
    let url = format!("{api_url}/v1/subscriptions");
    let response = reqwest::Client::new()
        .get(&url)
        .bearer_auth(api_key)
        .query(&[("customer", customer_id), ("limit", "5")])
        .send()
        .await
        .map_err(|e| BillingError::Provider(e.to_string()))?;

    if !response.status().is_success() {
        return Err(BillingError::Provider(format!(
            "subscription list returned {}",
            response.status()
        )));
    }

    let list: SubscriptionList = response
        .json()
        .await
        .map_err(|e| BillingError::Provider(e.to_string()))?;

    // Prefer an active subscription; otherwise take whatever the provider
    // lists first so past_due/trialing states still surface.
    let sub = list
        .data
        .iter()
        .find(|s| s.status == "active")
        .or_else(|| list.data.first());

    Ok(sub.map(|s| SubscriptionLookup {
        plan: s
            .items
            .data
            .first()
            .and_then(|item| plan_for_price_id(&item.price.id)),
        status: s.status.clone(),
        current_period_end: s
            .current_period_end
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
    }))
}
