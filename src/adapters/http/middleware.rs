use axum::{
    Extension,
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::{
    adapters::http::{
        app_state::AppState,
        cookies::{ACCESS_TOKEN_COOKIE, delete_cookie, get_cookie, has_cookie},
    },
    app_error::{AppError, AppResult},
    application::jwt,
    infra::config::AppConfig,
};

/// Authenticated caller, inserted into request extensions by `require_session`.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub email: Option<String>,
}

/// Reads the session token from the `access_token` cookie, falling back to
/// `Authorization: Bearer`.
pub fn current_user(jar: &CookieJar, headers: &HeaderMap, config: &AppConfig) -> AppResult<SessionUser> {
    let token = get_cookie(jar, ACCESS_TOKEN_COOKIE)
        .or_else(|| bearer_token(headers))
        .ok_or(AppError::InvalidCredentials)?;

    let claims = jwt::verify(&token, &config.jwt_secret)?;
    Ok(SessionUser {
        user_id: claims.user_id()?,
        email: claims.email,
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_owned())
}

pub async fn require_session(
    State(app_state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    match current_user(&jar, request.headers(), &app_state.config) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            Ok(next.run(request).await)
        }
        // Drop a stale session cookie so the client stops sending it.
        Err(err) if has_cookie(&jar, ACCESS_TOKEN_COOKIE) => {
            Err((delete_cookie(jar, ACCESS_TOKEN_COOKIE), err).into_response())
        }
        Err(err) => Err(err.into_response()),
    }
}

/// Per-user limit on provider mutations. Must run after `require_session`.
pub async fn plan_change_rate_limit(
    State(app_state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    app_state.rate_limiter.check_user(user.user_id).await?;
    Ok(next.run(request).await)
}
