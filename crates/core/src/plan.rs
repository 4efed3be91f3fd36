//! Subscription plans, credit allowances, and the metering policy.
//!
//! Every billing provider identifier is mapped to one of the internal plans
//! below before any entitlement or wallet mutation happens. The metering
//! policy is the single switch controlling whether admission consults the
//! wallet at all; the deployed product runs with metering disabled while the
//! ledger keeps recording grants for audit.

use serde::{Deserialize, Serialize};

/// Sentinel balance representing "effectively unlimited" credits.
///
/// Community-style plans are credited with this value instead of a metered
/// allowance. A revoked-billing event still forces it to zero.
pub const UNLIMITED_BALANCE: i64 = 999_999;

/// Monthly credit allowance for the `pro` plan.
pub const PRO_MONTHLY_CREDITS: i64 = 500;

/// Monthly credit allowance for the `proplus` plan.
pub const PROPLUS_MONTHLY_CREDITS: i64 = 1_500;

/// Days of continued access after a payment lapses before the account is
/// downgraded by the expiration sweep.
pub const GRACE_PERIOD_DAYS: i64 = 3;

/// Internal subscription plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Pro,
    ProPlus,
    Community,
    Admin,
}

impl Plan {
    /// The canonical string stored in the `entitlements.plan` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
            Plan::ProPlus => "proplus",
            Plan::Community => "community",
            Plan::Admin => "admin",
        }
    }

    /// Parse a stored plan string. Unknown values map to `Free` rather than
    /// erroring so a bad row cannot lock an account out entirely.
    pub fn parse(s: &str) -> Plan {
        match s {
            "pro" => Plan::Pro,
            "proplus" => Plan::ProPlus,
            "community" => Plan::Community,
            "admin" => Plan::Admin,
            _ => Plan::Free,
        }
    }

    /// Monthly credit allowance granted on a paid event for this plan.
    pub fn monthly_allowance(self) -> i64 {
        match self {
            Plan::Free => 0,
            Plan::Pro => PRO_MONTHLY_CREDITS,
            Plan::ProPlus => PROPLUS_MONTHLY_CREDITS,
            Plan::Community | Plan::Admin => UNLIMITED_BALANCE,
        }
    }
}

/// Static mapping from a provider price/product identifier to a plan.
///
/// Covers both the Stripe price ids and the alternate provider's product
/// names. Unknown identifiers return `None` and the event is logged and
/// skipped instead of guessing a plan.
pub fn plan_for_price_id(price_id: &str) -> Option<Plan> {
    match price_id {
        "price_abrahub_pro_monthly" | "price_abrahub_pro_yearly" => Some(Plan::Pro),
        "price_abrahub_proplus_monthly" | "price_abrahub_proplus_yearly" => Some(Plan::ProPlus),
        "price_abrahub_community" | "ABRAhub Community" | "ABRAhub Comunidade" => {
            Some(Plan::Community)
        }
        _ => None,
    }
}

/// Metering policy consulted at queue admission.
///
/// When disabled, the wallet is never read and every request is admitted
/// (the blocked flag is still enforced). When enabled, admission requires
/// `balance >= cost`.
#[derive(Debug, Clone, Copy)]
pub struct MeteringPolicy {
    pub enabled: bool,
}

impl MeteringPolicy {
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    /// Whether a wallet with `balance` may pay `cost` under this policy.
    pub fn can_spend(&self, balance: i64, cost: i64) -> bool {
        if !self.enabled {
            return true;
        }
        balance >= cost
    }
}
