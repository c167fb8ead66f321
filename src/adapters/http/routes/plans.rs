use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use serde_json::json;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_plans))
}

/// GET /api/plans
async fn list_plans(State(app_state): State<AppState>) -> impl IntoResponse {
    let plans = app_state.subscription_use_cases.catalog().plans();
    Json(json!({ "plans": plans }))
}
