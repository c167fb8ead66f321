//! Provider webhook endpoints.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::get,
};
use serde_json::{Value as JsonValue, json};
use tracing::{info, instrument};

use crate::{
    adapters::{http::app_state::AppState, payments::decode_events},
    app_error::{AppError, AppResult},
    domain::entities::payment_provider::PaymentProvider,
    infra::webhook_signature::verify_signature,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/{provider}", get(webhook_health).post(receive_webhook))
}

fn parse_provider(raw: &str) -> AppResult<PaymentProvider> {
    raw.parse()
        .map_err(|_| AppError::not_found(format!("Unknown payment provider: {raw}")))
}

/// GET /api/webhooks/{provider}
async fn webhook_health(Path(provider): Path<String>) -> AppResult<impl IntoResponse> {
    let provider = parse_provider(&provider)?;
    Ok(Json(json!({ "status": "ok", "provider": provider })))
}

/// POST /api/webhooks/{provider}
///
/// The signature covers the raw body, so it is taken as bytes and only parsed
/// after verification.
#[instrument(skip_all, fields(provider = %provider))]
async fn receive_webhook(
    State(app_state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let provider = parse_provider(&provider)?;

    let secret = app_state
        .config
        .webhook_secret(provider)
        .ok_or(AppError::WebhookNotConfigured(provider))?;

    let signature = headers
        .get(provider.signature_header())
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::InvalidInput(format!(
                "Missing {} signature header",
                provider.display_name()
            ))
        })?;

    verify_signature(provider, secret, &body, signature)?;

    let events = decode_events(provider, &body)?;
    // Already validated by the decoder; kept whole as the audit breadcrumb.
    let payload: JsonValue = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidInput(format!("Invalid webhook payload: {e}")))?;

    let summary = app_state
        .webhook_use_cases
        .process(&events, &payload)
        .await?;

    info!(
        events = events.len(),
        applied = summary.applied,
        ignored = summary.ignored,
        replayed = summary.replayed,
        "Webhook processed"
    );

    Ok(Json(json!({ "success": true })))
}
