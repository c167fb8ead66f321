//! HTTP client factory with consistent timeout configuration.
//!
//! Provider and email clients are built here rather than constructing
//! `reqwest::Client` directly.

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::payment_provider::PaymentProvider,
};

/// TCP handshake + TLS.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Total request/response time for provider and email APIs.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build an HTTP client with default timeouts.
pub fn try_build_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .build()
}

/// Map a provider response into `T`, turning non-2xx answers into
/// `AppError::Provider`. The body is logged, never returned to clients.
pub async fn handle_response<T: DeserializeOwned>(
    provider: PaymentProvider,
    response: reqwest::Response,
) -> AppResult<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AppError::Provider(format!("Failed to read {provider} response: {e}")))?;

    if !status.is_success() {
        tracing::error!(%provider, status = %status, body = %body, "Payment provider API error");
        return Err(AppError::Provider(format!(
            "{} API error: {status}",
            provider.display_name()
        )));
    }

    serde_json::from_str(&body).map_err(|e| {
        tracing::error!(%provider, body = %body, error = %e, "Failed to parse provider response");
        AppError::Provider(format!("Failed to parse {provider} response: {e}"))
    })
}

pub fn send_error(provider: PaymentProvider, err: reqwest::Error) -> AppError {
    tracing::error!(%provider, error = %err, "Payment provider request failed");
    AppError::Provider(format!("{} request failed", provider.display_name()))
}

/// Like `handle_response` for calls whose answer body we do not use.
pub async fn expect_success(provider: PaymentProvider, response: reqwest::Response) -> AppResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    tracing::error!(%provider, status = %status, body = %body, "Payment provider API error");
    Err(AppError::Provider(format!(
        "{} API error: {status}",
        provider.display_name()
    )))
}
