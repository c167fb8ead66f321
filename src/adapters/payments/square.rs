use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::{decode_data, invalid_payload, parse_envelope, require};
use crate::{
    app_error::AppResult,
    domain::entities::{
        payment::Money,
        payment_provider::PaymentProvider,
        subscription::SubscriptionStatus,
        webhook::{EventKind, PaymentSucceeded, ProviderEvent, SubscriptionActivation},
    },
};

const PROVIDER: PaymentProvider = PaymentProvider::Square;

#[derive(Debug, Deserialize)]
struct Envelope {
    event_id: String,
    #[serde(rename = "type")]
    event_type: String,
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct Data<T> {
    object: T,
}

#[derive(Debug, Deserialize)]
struct SubscriptionObject {
    subscription: SquareSubscription,
}

#[derive(Debug, Deserialize)]
struct SquareSubscription {
    id: String,
    customer_id: Option<String>,
    plan_variation_id: String,
    status: SquareSubscriptionStatus,
    /// Our user ID, attached when the subscription is created.
    reference_id: Option<String>,
    start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum SquareSubscriptionStatus {
    Pending,
    Active,
    Canceled,
    Deactivated,
    Paused,
}

#[derive(Debug, Deserialize)]
struct InvoiceObject {
    invoice: SquareInvoice,
}

#[derive(Debug, Deserialize)]
struct SquareInvoice {
    id: String,
    subscription_id: String,
    total_money: SquareMoney,
}

#[derive(Debug, Deserialize)]
struct SquareMoney {
    amount: i64,
    currency: String,
}

pub fn decode(body: &[u8]) -> AppResult<ProviderEvent> {
    let envelope: Envelope = parse_envelope(PROVIDER, body)?;
    let event_type = envelope.event_type.as_str();

    let kind = match event_type {
        "subscription.created" => {
            let data: Data<SubscriptionObject> = decode_data(PROVIDER, event_type, envelope.data)?;
            activation(event_type, data.object.subscription)?
        }
        "subscription.updated" => {
            let data: Data<SubscriptionObject> = decode_data(PROVIDER, event_type, envelope.data)?;
            let subscription = data.object.subscription;
            match subscription.status {
                SquareSubscriptionStatus::Canceled | SquareSubscriptionStatus::Deactivated => {
                    EventKind::SubscriptionCanceled {
                        provider_subscription_id: subscription.id,
                    }
                }
                _ => EventKind::PlanChanged {
                    provider_subscription_id: subscription.id,
                    plan_reference: subscription.plan_variation_id,
                },
            }
        }
        "invoice.payment_made" => {
            let data: Data<InvoiceObject> = decode_data(PROVIDER, event_type, envelope.data)?;
            let invoice = data.object.invoice;
            EventKind::PaymentSucceeded(PaymentSucceeded {
                provider_payment_id: invoice.id,
                provider_subscription_id: invoice.subscription_id,
                amount: Some(Money::new(
                    invoice.total_money.amount,
                    invoice.total_money.currency,
                )),
            })
        }
        _ => EventKind::Unrecognized,
    };

    Ok(ProviderEvent {
        provider: PROVIDER,
        event_id: envelope.event_id,
        event_type: envelope.event_type,
        occurred_at: envelope.created_at,
        kind,
    })
}

fn activation(event_type: &str, subscription: SquareSubscription) -> AppResult<EventKind> {
    let status = match subscription.status {
        SquareSubscriptionStatus::Pending => SubscriptionStatus::Trialing,
        SquareSubscriptionStatus::Active => SubscriptionStatus::Active,
        other => {
            return Err(invalid_payload(
                PROVIDER,
                format!("{event_type}: unexpected status {other:?}"),
            ));
        }
    };

    let reference = require(
        PROVIDER,
        event_type,
        "reference_id",
        subscription.reference_id,
    )?;
    let user_id = Uuid::parse_str(&reference)
        .map_err(|_| invalid_payload(PROVIDER, format!("{event_type}: reference_id is not a user ID")))?;

    Ok(EventKind::SubscriptionActivated(SubscriptionActivation {
        user_id,
        provider_subscription_id: subscription.id,
        provider_customer_id: subscription.customer_id,
        plan_reference: subscription.plan_variation_id,
        status,
        started_at: subscription
            .start_date
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc()),
    }))
}
