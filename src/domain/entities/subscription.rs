use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use super::payment_provider::PaymentProvider;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, AsRefStr, Display,
    EnumString,
)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    Canceled,
    Expired,
}

impl SubscriptionStatus {
    /// Returns true if the user should have access to paid features
    pub fn grants_access(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trialing)
    }

    /// Status to store when an activation event is (re)applied on top of `existing`.
    ///
    /// `existing` pairs the stored status with whether it belongs to the same
    /// provider subscription. For that subscription a late or redelivered
    /// `created` event never reopens a canceled row, never restarts an expired
    /// trial and never pulls a paid row back into its trial.
    pub fn after_activation(
        existing: Option<(SubscriptionStatus, bool)>,
        incoming: SubscriptionStatus,
    ) -> SubscriptionStatus {
        match (existing, incoming) {
            (Some((SubscriptionStatus::Canceled, true)), _) => SubscriptionStatus::Canceled,
            (Some((SubscriptionStatus::Expired, true)), SubscriptionStatus::Trialing) => {
                SubscriptionStatus::Expired
            }
            (Some((SubscriptionStatus::Active, true)), SubscriptionStatus::Trialing) => {
                SubscriptionStatus::Active
            }
            _ => incoming,
        }
    }

    /// Status after a successful payment, or None when the payment must not
    /// reactivate the subscription.
    pub fn after_payment(&self) -> Option<SubscriptionStatus> {
        match self {
            SubscriptionStatus::Canceled => None,
            SubscriptionStatus::Trialing
            | SubscriptionStatus::Active
            | SubscriptionStatus::Expired => Some(SubscriptionStatus::Active),
        }
    }
}

/// Subscription record as stored.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: String,
    pub provider: PaymentProvider,
    pub provider_subscription_id: Option<String>,
    pub provider_customer_id: Option<String>,
    pub status: SubscriptionStatus,
    pub trial_start: Option<DateTime<Utc>>,
    pub trial_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// The provider-side key used for every remote mutation.
    pub fn provider_reference(&self) -> Option<&str> {
        self.provider_subscription_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
    }
}

/// Values written by an upsert keyed on the user.
#[derive(Debug, Clone)]
pub struct SubscriptionUpsert {
    pub user_id: Uuid,
    pub plan_id: String,
    pub provider: PaymentProvider,
    pub provider_subscription_id: Option<String>,
    pub provider_customer_id: Option<String>,
    pub status: SubscriptionStatus,
    pub trial_start: Option<DateTime<Utc>>,
    pub trial_end: Option<DateTime<Utc>>,
}
