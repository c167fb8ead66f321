use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

const GENERIC_FAILURE: &str = "Something went wrong. Please try again later.";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let status = status_for(&self);

        // Log the error before it gets converted into a status response.
        if status.is_server_error() {
            tracing::error!(error = %self, code = code.as_str(), "Request failed");
        } else {
            tracing::warn!(error = %self, code = code.as_str(), "Request rejected");
        }

        match self {
            AppError::RateLimited { reset_at } => {
                let body = serde_json::json!({
                    "error": "Too many requests. Please try again later.",
                    "code": code.as_str(),
                    "reset": reset_at.to_rfc3339(),
                });
                (status, Json(body)).into_response()
            }
            AppError::Database(_) | AppError::Internal(_) => {
                error_resp(status, code, GENERIC_FAILURE.to_string())
            }
            AppError::Provider(_) => error_resp(
                status,
                code,
                "The payment provider could not complete the request. Please try again later."
                    .to_string(),
            ),
            other => error_resp(status, code, other.to_string()),
        }
    }
}

pub fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::Database(_) | AppError::Internal(_) | AppError::Provider(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        AppError::InvalidCredentials | AppError::InvalidSignature => StatusCode::UNAUTHORIZED,
        AppError::WebhookNotConfigured(_)
        | AppError::InvalidInput(_)
        | AppError::Precondition(_) => StatusCode::BAD_REQUEST,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::MissingProviderReference => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: String) -> Response {
    let body = serde_json::json!({ "error": message, "code": code.as_str() });
    (status, Json(body)).into_response()
}
