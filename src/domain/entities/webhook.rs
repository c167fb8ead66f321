use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{payment::Money, payment_provider::PaymentProvider, subscription::SubscriptionStatus};

/// A provider event after decoding, independent of the provider's wire shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderEvent {
    pub provider: PaymentProvider,
    /// Provider-assigned event ID, used for replay detection.
    pub event_id: String,
    /// Event type exactly as the provider named it.
    pub event_type: String,
    pub occurred_at: Option<DateTime<Utc>>,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    SubscriptionActivated(SubscriptionActivation),
    PlanChanged {
        provider_subscription_id: String,
        plan_reference: String,
    },
    PaymentSucceeded(PaymentSucceeded),
    SubscriptionCanceled {
        provider_subscription_id: String,
    },
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionActivation {
    pub user_id: Uuid,
    pub provider_subscription_id: String,
    pub provider_customer_id: Option<String>,
    /// Plan reference as sent by the provider; resolved through the catalog.
    pub plan_reference: String,
    /// Either `Trialing` or `Active`.
    pub status: SubscriptionStatus,
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentSucceeded {
    pub provider_payment_id: String,
    pub provider_subscription_id: String,
    /// Absent for providers whose events do not carry the amount.
    pub amount: Option<Money>,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::SubscriptionActivated(_) => "subscription_activated",
            EventKind::PlanChanged { .. } => "plan_changed",
            EventKind::PaymentSucceeded(_) => "payment_succeeded",
            EventKind::SubscriptionCanceled { .. } => "subscription_canceled",
            EventKind::Unrecognized => "unrecognized",
        }
    }
}
