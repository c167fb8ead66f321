use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::{invalid_payload, parse_envelope, require};
use crate::{
    app_error::AppResult,
    domain::entities::{
        payment_provider::PaymentProvider,
        subscription::SubscriptionStatus,
        webhook::{EventKind, PaymentSucceeded, ProviderEvent, SubscriptionActivation},
    },
};

const PROVIDER: PaymentProvider = PaymentProvider::GoCardless;

/// GoCardless delivers events in batches.
#[derive(Debug, Deserialize)]
struct Batch {
    events: Vec<GoCardlessEvent>,
}

#[derive(Debug, Deserialize)]
struct GoCardlessEvent {
    id: String,
    created_at: Option<DateTime<Utc>>,
    resource_type: String,
    action: String,
    #[serde(default)]
    links: Links,
    #[serde(default)]
    metadata: Metadata,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    subscription: Option<String>,
    payment: Option<String>,
    customer: Option<String>,
    mandate: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    user_id: Option<String>,
    plan_id: Option<String>,
}

pub fn decode(body: &[u8]) -> AppResult<Vec<ProviderEvent>> {
    let batch: Batch = parse_envelope(PROVIDER, body)?;
    batch.events.into_iter().map(normalize).collect()
}

fn normalize(event: GoCardlessEvent) -> AppResult<ProviderEvent> {
    let event_type = format!("{}.{}", event.resource_type, event.action);

    let kind = match (event.resource_type.as_str(), event.action.as_str()) {
        ("subscriptions", "created") => {
            let provider_subscription_id =
                require(PROVIDER, &event_type, "links.subscription", event.links.subscription)?;
            let user_id = require(PROVIDER, &event_type, "metadata.user_id", event.metadata.user_id)?;
            let user_id = Uuid::parse_str(&user_id).map_err(|_| {
                invalid_payload(PROVIDER, format!("{event_type}: metadata.user_id is not a user ID"))
            })?;
            let plan_reference =
                require(PROVIDER, &event_type, "metadata.plan_id", event.metadata.plan_id)?;

            EventKind::SubscriptionActivated(SubscriptionActivation {
                user_id,
                provider_subscription_id,
                // Direct-debit customers are identified by their mandate when
                // the customer link is absent.
                provider_customer_id: event.links.customer.or(event.links.mandate),
                plan_reference,
                status: SubscriptionStatus::Trialing,
                started_at: event.created_at,
            })
        }
        ("subscriptions", "cancelled" | "finished") => EventKind::SubscriptionCanceled {
            provider_subscription_id: require(
                PROVIDER,
                &event_type,
                "links.subscription",
                event.links.subscription,
            )?,
        },
        ("payments", "confirmed" | "paid_out") => EventKind::PaymentSucceeded(PaymentSucceeded {
            provider_payment_id: require(PROVIDER, &event_type, "links.payment", event.links.payment)?,
            provider_subscription_id: require(
                PROVIDER,
                &event_type,
                "links.subscription",
                event.links.subscription,
            )?,
            amount: None,
        }),
        _ => EventKind::Unrecognized,
    };

    Ok(ProviderEvent {
        provider: PROVIDER,
        event_id: event.id,
        event_type,
        occurred_at: event.created_at,
        kind,
    })
}
