use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use super::payment::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Monthly,
    Yearly,
}

impl BillingInterval {
    /// GoCardless `interval_unit`
    pub fn to_interval_unit(&self) -> &'static str {
        match self {
            BillingInterval::Monthly => "monthly",
            BillingInterval::Yearly => "yearly",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub id: &'static str,
    pub name: &'static str,
    pub price_cents: i64,
    pub currency: &'static str,
    pub interval: BillingInterval,
    pub features: &'static [&'static str],
    /// Plan variation configured in Square for this plan.
    #[serde(skip)]
    pub square_plan_variation_id: &'static str,
}

impl Plan {
    pub fn price(&self) -> Money {
        Money::new(self.price_cents, self.currency)
    }
}

const PLANS: &[Plan] = &[
    Plan {
        id: "basic_monthly",
        name: "Basic",
        price_cents: 499,
        currency: "USD",
        interval: BillingInterval::Monthly,
        features: &["Dose calculator", "30-day session log", "Strain library"],
        square_plan_variation_id: "SQ_VAR_BASIC_MONTHLY",
    },
    Plan {
        id: "premium_monthly",
        name: "Premium",
        price_cents: 999,
        currency: "USD",
        interval: BillingInterval::Monthly,
        features: &[
            "Dose calculator",
            "Unlimited session log",
            "Strain library",
            "Tolerance charts",
            "CSV export",
        ],
        square_plan_variation_id: "SQ_VAR_PREMIUM_MONTHLY",
    },
    Plan {
        id: "premium_yearly",
        name: "Premium (Annual)",
        price_cents: 9_999,
        currency: "USD",
        interval: BillingInterval::Yearly,
        features: &[
            "Dose calculator",
            "Unlimited session log",
            "Strain library",
            "Tolerance charts",
            "CSV export",
        ],
        square_plan_variation_id: "SQ_VAR_PREMIUM_YEARLY",
    },
];

/// Plan IDs used before the catalog was renumbered, and their replacements.
pub const LEGACY_PLAN_IDS: &[(&str, &str)] = &[
    ("1", "basic_monthly"),
    ("2", "premium_monthly"),
    ("3", "premium_yearly"),
];

/// Moment the numeric plan IDs were replaced by named ones.
pub fn plans_renumbered_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Static, hard-coded plan catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanCatalog;

impl PlanCatalog {
    pub fn plans(&self) -> &'static [Plan] {
        PLANS
    }

    /// Exact lookup by current plan ID.
    pub fn get(&self, id: &str) -> Option<&'static Plan> {
        PLANS.iter().find(|p| p.id == id)
    }

    /// Resolve any plan reference we may receive: a current ID, a pre-renumbering
    /// legacy ID, or a provider plan reference.
    pub fn resolve(&self, reference: &str) -> Option<&'static Plan> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        if let Some(plan) = self.get(reference) {
            return Some(plan);
        }
        if let Some(current) = legacy_replacement(reference) {
            return self.get(current);
        }
        PLANS
            .iter()
            .find(|p| p.square_plan_variation_id == reference)
    }
}

/// Current plan ID for a legacy numeric ID.
pub fn legacy_replacement(legacy_id: &str) -> Option<&'static str> {
    LEGACY_PLAN_IDS
        .iter()
        .find(|(old, _)| *old == legacy_id)
        .map(|(_, new)| *new)
}
