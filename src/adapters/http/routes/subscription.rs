use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::parse_body;
use crate::{
    adapters::http::{
        app_state::AppState,
        middleware::{SessionUser, plan_change_rate_limit, require_session},
    },
    app_error::AppResult,
    domain::entities::payment_provider::PaymentProvider,
    use_cases::subscription::{CreateSubscriptionInput, PlanChangeRequestInput},
};

/// Every route needs a session; provider mutations are also rate limited.
pub fn router(app_state: AppState) -> Router<AppState> {
    let limited = Router::new()
        .route("/cancel", post(cancel_subscription))
        .route("/plan-change", post(change_plan))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            plan_change_rate_limit,
        ));

    Router::new()
        .route("/", post(create_subscription))
        .route("/status", get(get_status))
        .route("/plan-change-request", post(request_plan_change))
        .merge(limited)
        .route_layer(middleware::from_fn_with_state(app_state, require_session))
}

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Debug, Deserialize)]
struct CreateSubscriptionBody {
    #[serde(default)]
    plan_id: String,
    provider: Option<PaymentProvider>,
    #[serde(default)]
    customer_id: String,
}

#[derive(Debug, Deserialize)]
struct PlanChangeBody {
    #[serde(default)]
    new_plan_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlanChangeRequestBody {
    requested_plan_id: Option<String>,
    #[serde(default)]
    message: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/subscription/status
async fn get_status(
    State(app_state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> AppResult<impl IntoResponse> {
    let overview = app_state
        .subscription_use_cases
        .status(user.user_id, Utc::now())
        .await?;
    Ok(Json(json!({ "subscription": overview })))
}

/// POST /api/subscription
async fn create_subscription(
    State(app_state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let body: CreateSubscriptionBody = parse_body(&body)?;
    let subscription = app_state
        .subscription_use_cases
        .create(
            user.user_id,
            CreateSubscriptionInput {
                plan_id: body.plan_id,
                provider: body.provider,
                customer_id: body.customer_id,
            },
            Utc::now(),
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "subscription": subscription })),
    ))
}

/// POST /api/subscription/cancel
///
/// Only the provider is told; the local row follows with the webhook.
async fn cancel_subscription(
    State(app_state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> AppResult<impl IntoResponse> {
    let accepted = app_state.subscription_use_cases.cancel(user.user_id).await?;
    Ok(Json(json!({ "success": true, "subscription": accepted })))
}

/// POST /api/subscription/plan-change
async fn change_plan(
    State(app_state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let body: PlanChangeBody = parse_body(&body)?;
    let accepted = app_state
        .subscription_use_cases
        .change_plan(user.user_id, body.new_plan_id.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(json!({ "success": true, "subscription": accepted })))
}

/// POST /api/subscription/plan-change-request
async fn request_plan_change(
    State(app_state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let body: PlanChangeRequestBody = parse_body(&body)?;
    app_state
        .subscription_use_cases
        .request_plan_change(
            user.user_id,
            user.email.as_deref(),
            PlanChangeRequestInput {
                requested_plan_id: body.requested_plan_id,
                message: body.message,
            },
        )
        .await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "success": true }))))
}
