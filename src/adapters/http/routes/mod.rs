pub mod plans;
pub mod subscription;
pub mod webhooks;

use axum::{
    Router,
    body::Bytes,
};
use serde::de::DeserializeOwned;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
};

/// Routes under `/api`. Session and rate-limit layers need the state up front.
pub fn router(app_state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/webhooks", webhooks::router())
        .nest("/subscription", subscription::router(app_state))
        .nest("/plans", plans::router())
}

/// Parse a JSON body into `T`, reporting failures as `INVALID_INPUT`.
///
/// Done by hand instead of with the `Json` extractor so that auth and rate
/// limiting are decided before the body is looked at.
pub(crate) fn parse_body<T: DeserializeOwned>(body: &Bytes) -> AppResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::InvalidInput(format!("Invalid request body: {e}")))
}
