//! Per-provider webhook payload decoding.
//!
//! Each provider's payload is read as an envelope first; the `data` of every
//! event type we act on is then decoded into a typed struct. A known event
//! type whose shape does not match is rejected (400) rather than applied with
//! partial data. Unknown event types decode to `EventKind::Unrecognized`.

pub mod checkout;
pub mod gocardless;
pub mod square;

use serde::de::DeserializeOwned;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{payment_provider::PaymentProvider, webhook::ProviderEvent},
};

/// Decode a verified request body into normalized events.
pub fn decode_events(provider: PaymentProvider, body: &[u8]) -> AppResult<Vec<ProviderEvent>> {
    match provider {
        PaymentProvider::Square => square::decode(body).map(|event| vec![event]),
        PaymentProvider::GoCardless => gocardless::decode(body),
        PaymentProvider::Checkout => checkout::decode(body).map(|event| vec![event]),
    }
}

pub(crate) fn invalid_payload(
    provider: PaymentProvider,
    detail: impl std::fmt::Display,
) -> AppError {
    AppError::InvalidInput(format!(
        "Invalid {} webhook payload: {detail}",
        provider.display_name()
    ))
}

pub(crate) fn parse_envelope<T: DeserializeOwned>(
    provider: PaymentProvider,
    body: &[u8],
) -> AppResult<T> {
    serde_json::from_slice(body).map_err(|e| invalid_payload(provider, e))
}

/// Decode the data of a known event type, failing closed.
pub(crate) fn decode_data<T: DeserializeOwned>(
    provider: PaymentProvider,
    event_type: &str,
    data: serde_json::Value,
) -> AppResult<T> {
    serde_json::from_value(data)
        .map_err(|e| invalid_payload(provider, format!("{event_type}: {e}")))
}

pub(crate) fn require<T>(
    provider: PaymentProvider,
    event_type: &str,
    field: &str,
    value: Option<T>,
) -> AppResult<T> {
    value.ok_or_else(|| invalid_payload(provider, format!("{event_type}: missing {field}")))
}
