use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use time::Duration;

use super::{client_ip, enforce_rate_limit, parse_json, session_cookie};
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::{BookingProjection, BookingStatus, RescheduleRequest};
use crate::services::session::{self, ClientSession, SESSION_TTL_SECS};
use crate::services::{phone, reschedule as rescheduling};
use crate::state::AppState;

const OPEN_STATUSES: [BookingStatus; 2] = [BookingStatus::Pending, BookingStatus::Confirmed];

fn require_session(state: &AppState, jar: &CookieJar) -> AppResult<ClientSession> {
    let token = jar.get(session::COOKIE_NAME).map(|c| c.value());
    session::verify(&state.config.session_secret, token, Utc::now().timestamp())
        .map_err(|e| AppError::Unauthorized(e.to_string()))
}

fn with_session(state: &AppState, jar: CookieJar, phone: &str) -> AppResult<CookieJar> {
    let token = session::issue(&state.config.session_secret, phone, Utc::now().timestamp())?;
    Ok(jar.add(session_cookie(
        session::COOKIE_NAME,
        token,
        Duration::seconds(SESSION_TTL_SECS),
    )))
}

fn open_bookings(state: &AppState, phone: &str) -> AppResult<Vec<BookingProjection>> {
    let conn = state.conn()?;
    let rows = queries::list_by_contact(&conn, &state.config.brand_id, phone, &OPEN_STATUSES)?;
    Ok(rows.into_iter().map(BookingProjection::from).collect())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PhoneBody {
    pub phone: String,
}

// POST /api/bookings/lookup
#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub success: bool,
    pub bookings: Vec<BookingProjection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub async fn lookup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    payload: Result<Json<PhoneBody>, JsonRejection>,
) -> AppResult<(CookieJar, Json<LookupResponse>)> {
    enforce_rate_limit(&state, &format!("lookup:{}", client_ip(&headers))).await?;
    let body = parse_json(payload)?;
    if body.phone.trim().is_empty() {
        return Err(AppError::BadRequest("Phone number is required".to_string()));
    }

    let contact = phone::normalize_phone(&body.phone);
    let bookings = open_bookings(&state, &contact)?;

    if bookings.is_empty() {
        return Ok((
            jar,
            Json(LookupResponse {
                success: true,
                bookings,
                message: Some("No upcoming bookings found for this phone number.".to_string()),
            }),
        ));
    }

    let jar = with_session(&state, jar, &contact)?;
    Ok((
        jar,
        Json(LookupResponse {
            success: true,
            bookings,
            message: None,
        }),
    ))
}

// GET /api/bookings/mine
#[derive(Debug, Serialize)]
pub struct MyBookingsResponse {
    pub bookings: Vec<BookingProjection>,
}

pub async fn my_bookings(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> AppResult<Json<MyBookingsResponse>> {
    let session = require_session(&state, &jar)?;
    let bookings = open_bookings(&state, &session.phone)?;
    Ok(Json(MyBookingsResponse { bookings }))
}

// POST /api/bookings/reschedule
#[derive(Debug, Serialize)]
pub struct RescheduleResponse {
    pub success: bool,
    pub message: String,
    pub booking: BookingProjection,
}

pub async fn reschedule(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: Result<Json<RescheduleRequest>, JsonRejection>,
) -> AppResult<Json<RescheduleResponse>> {
    let session = require_session(&state, &jar)?;
    let request = parse_json(payload)?;
    let today = Local::now().date_naive();

    let booking = {
        let conn = state.conn()?;
        rescheduling::reschedule(&conn, &state.config.brand_id, &session.phone, &request, today)?
    };

    Ok(Json(RescheduleResponse {
        success: true,
        message: "Booking rescheduled successfully".to_string(),
        booking,
    }))
}

// POST /api/otp/send
pub async fn send_otp(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<PhoneBody>, JsonRejection>,
) -> AppResult<Json<serde_json::Value>> {
    enforce_rate_limit(&state, &format!("otp:{}", client_ip(&headers))).await?;
    let body = parse_json(payload)?;
    if body.phone.trim().is_empty() {
        return Err(AppError::BadRequest("Phone number is required".to_string()));
    }

    let contact = phone::normalize_phone(&body.phone);
    if let Err(e) = state.verifier.send_code(&contact).await {
        tracing::error!(phone = %contact, error = %e, "failed to send verification code");
        return Err(AppError::BadRequest(
            "Failed to send verification code".to_string(),
        ));
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Verification code sent"
    })))
}

// POST /api/otp/verify
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyOtpBody {
    pub phone: String,
    pub code: String,
}

pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    payload: Result<Json<VerifyOtpBody>, JsonRejection>,
) -> AppResult<(CookieJar, Json<serde_json::Value>)> {
    enforce_rate_limit(&state, &format!("otp:{}", client_ip(&headers))).await?;
    let body = parse_json(payload)?;
    if body.phone.trim().is_empty() || body.code.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Phone and verification code are required".to_string(),
        ));
    }

    let contact = phone::normalize_phone(&body.phone);
    let approved = state
        .verifier
        .check_code(&contact, body.code.trim())
        .await
        .map_err(|e| AppError::Internal(format!("verification check failed: {e}")))?;
    if !approved {
        return Err(AppError::BadRequest(
            "Invalid or expired verification code".to_string(),
        ));
    }

    {
        let conn = state.conn()?;
        let brand_id = &state.config.brand_id;
        let name = queries::get_client_profile(&conn, brand_id, &contact)?
            .map(|p| p.name)
            .unwrap_or_default();
        queries::upsert_client_profile(&conn, brand_id, &contact, &name, Some(true))?;
    }
    tracing::info!(phone = %contact, "phone verified");

    let jar = with_session(&state, jar, &contact)?;
    Ok((
        jar,
        Json(serde_json::json!({ "success": true, "verified": true })),
    ))
}
