pub mod admin;
pub mod bookings;
pub mod client;
pub mod health;
pub mod payments;

use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Unwraps a JSON body, turning any rejection into a plain 400.
pub(crate) fn parse_json<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected request body");
        AppError::BadRequest("Invalid request body".to_string())
    })
}

/// First hop of `X-Forwarded-For`, falling back to `X-Real-IP`.
pub(crate) fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

pub(crate) fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub(crate) async fn enforce_rate_limit(state: &AppState, key: &str) -> AppResult<()> {
    let result = state.rate_limiter.check(key).await;
    if result.success {
        Ok(())
    } else {
        tracing::warn!(key, "rate limit exceeded");
        Err(AppError::RateLimited)
    }
}

pub(crate) fn session_cookie(name: &'static str, value: String, max_age: Duration) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(max_age)
        .build()
}

pub(crate) fn expired_cookie(name: &'static str) -> Cookie<'static> {
    session_cookie(name, String::new(), Duration::seconds(0))
}
