use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use chrono::{Local, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use time::Duration;

use super::{client_ip, enforce_rate_limit, expired_cookie, parse_json, session_cookie, user_agent};
use crate::db::queries::{self, BookingFilters};
use crate::errors::{AppError, AppResult};
use crate::models::request::TIME_RE;
use crate::models::{AdminUser, Booking, BookingProjection, BookingStatus, BookingUpdate, PaymentStatus};
use crate::services::admin_auth::{self, SESSION_TTL_HOURS};
use crate::services::dashboard::{self, CalendarMonth, DashboardStats};
use crate::services::revenue::{self, Period, RevenueReport};
use crate::state::AppState;

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Session token from the `admin_session` cookie, else a bearer token.
fn session_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    if let Some(cookie) = jar.get(admin_auth::COOKIE_NAME) {
        return Some(cookie.value().to_string());
    }
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
}

fn require_admin(state: &AppState, headers: &HeaderMap, jar: &CookieJar) -> AppResult<AdminUser> {
    let unauthorized = || AppError::Unauthorized("Not authenticated".to_string());
    let token = session_token(headers, jar).ok_or_else(unauthorized)?;

    let conn = state.conn()?;
    let admin = admin_auth::verify_session(&conn, &state.config.brand_id, &token, now())?;
    admin.ok_or_else(unauthorized)
}

fn parse_date(field: &str, value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Invalid {field} date")))
}

// POST /api/admin/login
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub expires_at: NaiveDateTime,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    payload: Result<Json<LoginBody>, JsonRejection>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    let body = parse_json(payload)?;
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }
    enforce_rate_limit(&state, &format!("login:{}", body.email.trim().to_lowercase())).await?;

    let ip = client_ip(&headers);
    let ua = user_agent(&headers);
    let session = {
        let conn = state.conn()?;
        admin_auth::login(
            &conn,
            &state.config.brand_id,
            &body.email,
            &body.password,
            now(),
            Some(ip.as_str()),
            ua.as_deref(),
        )?
    };
    let session =
        session.ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let jar = jar.add(session_cookie(
        admin_auth::COOKIE_NAME,
        session.token.clone(),
        Duration::hours(SESSION_TTL_HOURS),
    ));
    Ok((
        jar,
        Json(LoginResponse {
            success: true,
            token: session.token,
            expires_at: session.expires_at,
        }),
    ))
}

// POST /api/admin/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<serde_json::Value>)> {
    if let Some(token) = session_token(&headers, &jar) {
        let conn = state.conn()?;
        admin_auth::logout(&conn, &token)?;
    }
    Ok((
        jar.add(expired_cookie(admin_auth::COOKIE_NAME)),
        Json(serde_json::json!({ "success": true })),
    ))
}

// GET /api/admin/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> AppResult<Json<DashboardStats>> {
    require_admin(&state, &headers, &jar)?;
    let conn = state.conn()?;
    Ok(Json(dashboard::stats(&conn, &state.config.brand_id, today())?))
}

// GET /api/admin/bookings
#[derive(Debug, Default, Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookingsResponse {
    pub bookings: Vec<Booking>,
}

impl BookingsQuery {
    fn into_filters(self) -> AppResult<BookingFilters> {
        let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let status = match non_empty(self.status).as_deref() {
            None | Some("all") => None,
            Some(s) => Some(
                s.parse::<BookingStatus>()
                    .map_err(|_| AppError::BadRequest(format!("Invalid status: {s}")))?,
            ),
        };
        Ok(BookingFilters {
            status,
            from: non_empty(self.from).map(|d| parse_date("from", &d)).transpose()?,
            to: non_empty(self.to).map(|d| parse_date("to", &d)).transpose()?,
            search: non_empty(self.search),
        })
    }
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(query): Query<BookingsQuery>,
) -> AppResult<Json<BookingsResponse>> {
    require_admin(&state, &headers, &jar)?;
    let filters = query.into_filters()?;

    let conn = state.conn()?;
    let bookings = queries::list_bookings(&conn, &state.config.brand_id, &filters)?;
    Ok(Json(BookingsResponse { bookings }))
}

// GET /api/admin/bookings/:id
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub booking: Booking,
}

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    Path(id): Path<String>,
) -> AppResult<Json<BookingResponse>> {
    require_admin(&state, &headers, &jar)?;

    let conn = state.conn()?;
    let booking = queries::get_booking_by_id(&conn, &state.config.brand_id, &id)?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;
    Ok(Json(BookingResponse { booking }))
}

// PATCH /api/admin/bookings/:id
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateBookingBody {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub notes: Option<String>,
}

impl UpdateBookingBody {
    fn into_update(self) -> AppResult<BookingUpdate> {
        let status = self
            .status
            .map(|s| {
                s.parse::<BookingStatus>()
                    .map_err(|_| AppError::BadRequest(format!("Invalid status: {s}")))
            })
            .transpose()?;
        let payment_status = self
            .payment_status
            .map(|s| {
                s.parse::<PaymentStatus>()
                    .map_err(|_| AppError::BadRequest(format!("Invalid payment status: {s}")))
            })
            .transpose()?;
        let date = self.date.map(|d| parse_date("booking", &d)).transpose()?;
        let time = match self.time {
            Some(t) if !TIME_RE.is_match(t.trim()) => {
                return Err(AppError::BadRequest("Invalid time".to_string()))
            }
            other => other.map(|t| t.trim().to_string()),
        };

        Ok(BookingUpdate {
            date,
            time,
            status,
            payment_status,
            notes: self.notes,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct UpdateBookingResponse {
    pub success: bool,
    pub booking: BookingProjection,
}

pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    Path(id): Path<String>,
    payload: Result<Json<UpdateBookingBody>, JsonRejection>,
) -> AppResult<Json<UpdateBookingResponse>> {
    let admin = require_admin(&state, &headers, &jar)?;
    let update = parse_json(payload)?.into_update()?;

    let conn = state.conn()?;
    let booking = queries::update_booking(&conn, &state.config.brand_id, &id, &update)?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;
    tracing::info!(booking_id = %id, admin = %admin.email, "booking updated by admin");

    Ok(Json(UpdateBookingResponse {
        success: true,
        booking,
    }))
}

// GET /api/admin/calendar
#[derive(Debug, Default, Deserialize)]
pub struct CalendarQuery {
    pub month: Option<String>,
}

pub async fn get_calendar(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(query): Query<CalendarQuery>,
) -> AppResult<Json<CalendarMonth>> {
    require_admin(&state, &headers, &jar)?;

    let conn = state.conn()?;
    let calendar = dashboard::calendar_month(
        &conn,
        &state.config.brand_id,
        query.month.as_deref(),
        today(),
    )?;
    Ok(Json(calendar))
}

// GET /api/admin/revenue
#[derive(Debug, Default, Deserialize)]
pub struct RevenueQuery {
    pub period: Option<String>,
}

pub async fn get_revenue(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(query): Query<RevenueQuery>,
) -> AppResult<Json<RevenueReport>> {
    require_admin(&state, &headers, &jar)?;
    let period = Period::parse(query.period.as_deref());

    let conn = state.conn()?;
    let report = revenue::revenue_report(&conn, &state.config.brand_id, period, today())?;
    Ok(Json(report))
}
