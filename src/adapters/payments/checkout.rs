use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::{decode_data, parse_envelope};
use crate::{
    app_error::AppResult,
    domain::entities::{
        payment::Money,
        payment_provider::PaymentProvider,
        subscription::SubscriptionStatus,
        webhook::{EventKind, PaymentSucceeded, ProviderEvent, SubscriptionActivation},
    },
};

const PROVIDER: PaymentProvider = PaymentProvider::Checkout;

#[derive(Debug, Deserialize)]
struct Envelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    created_on: Option<DateTime<Utc>>,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SubscriptionActivated {
    id: String,
    customer_id: Option<String>,
    user_id: Uuid,
    plan_id: String,
    status: ActivationStatus,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ActivationStatus {
    Trialing,
    Active,
}

#[derive(Debug, Deserialize)]
struct SubscriptionUpdated {
    id: String,
    plan_id: String,
}

#[derive(Debug, Deserialize)]
struct SubscriptionCanceled {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PaymentCaptured {
    id: String,
    subscription_id: String,
    amount: i64,
    currency: String,
}

pub fn decode(body: &[u8]) -> AppResult<ProviderEvent> {
    let envelope: Envelope = parse_envelope(PROVIDER, body)?;
    let event_type = envelope.event_type.as_str();

    let kind = match event_type {
        "subscription_created" | "subscription_activated" => {
            let data: SubscriptionActivated = decode_data(PROVIDER, event_type, envelope.data)?;
            EventKind::SubscriptionActivated(SubscriptionActivation {
                user_id: data.user_id,
                provider_subscription_id: data.id,
                provider_customer_id: data.customer_id,
                plan_reference: data.plan_id,
                status: match data.status {
                    ActivationStatus::Trialing => SubscriptionStatus::Trialing,
                    ActivationStatus::Active => SubscriptionStatus::Active,
                },
                started_at: envelope.created_on,
            })
        }
        "subscription_updated" => {
            let data: SubscriptionUpdated = decode_data(PROVIDER, event_type, envelope.data)?;
            EventKind::PlanChanged {
                provider_subscription_id: data.id,
                plan_reference: data.plan_id,
            }
        }
        "subscription_canceled" => {
            let data: SubscriptionCanceled = decode_data(PROVIDER, event_type, envelope.data)?;
            EventKind::SubscriptionCanceled {
                provider_subscription_id: data.id,
            }
        }
        "payment_captured" => {
            let data: PaymentCaptured = decode_data(PROVIDER, event_type, envelope.data)?;
            EventKind::PaymentSucceeded(PaymentSucceeded {
                provider_payment_id: data.id,
                provider_subscription_id: data.subscription_id,
                amount: Some(Money::new(data.amount, data.currency)),
            })
        }
        _ => EventKind::Unrecognized,
    };

    Ok(ProviderEvent {
        provider: PROVIDER,
        event_id: envelope.id,
        event_type: envelope.event_type,
        occurred_at: envelope.created_on,
        kind,
    })
}
