use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Local;
use serde::Serialize;

use super::{client_ip, enforce_rate_limit, parse_json};
use crate::errors::AppResult;
use crate::models::{CreateBookingRequest, PromoBookingRequest};
use crate::services::booking;
use crate::state::AppState;

// POST /api/bookings/create
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingResponse {
    pub success: bool,
    pub booking_id: String,
    pub message: String,
    pub promo_applied: bool,
    pub price: i64,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> AppResult<Json<CreateBookingResponse>> {
    enforce_rate_limit(&state, &format!("booking:{}", client_ip(&headers))).await?;
    let request = parse_json(payload)?;

    let created = {
        let conn = state.conn()?;
        booking::create_booking(&conn, &state.config, &request)?
    };

    // Sent even when the insert failed; the owner still needs to know.
    let jobs = state.notifier.booking_created(&created.notice);
    state.notifier.spawn_dispatch(jobs);

    Ok(Json(CreateBookingResponse {
        success: true,
        booking_id: created.booking_id,
        message: "Booking created successfully".to_string(),
        promo_applied: created.promo_applied,
        price: created.price,
    }))
}

// POST /api/bookings/promo
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoBookingResponse {
    pub success: bool,
    pub booking_id: String,
    pub message: String,
    pub price: i64,
}

pub async fn create_promo_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<PromoBookingRequest>, JsonRejection>,
) -> AppResult<Json<PromoBookingResponse>> {
    enforce_rate_limit(&state, &format!("booking:{}", client_ip(&headers))).await?;
    let request = parse_json(payload)?;
    let today = Local::now().date_naive();

    let created = {
        let conn = state.conn()?;
        booking::create_promo_booking(&conn, &state.config, &request, today)?
    };

    let jobs = state.notifier.promo_booking_created(
        &created.notice,
        created.offer.name,
        created.offer.code,
    );
    state.notifier.spawn_dispatch(jobs);

    Ok(Json(PromoBookingResponse {
        success: true,
        booking_id: created.booking.id,
        message: "Booking created successfully! We'll contact you within 24 hours to schedule."
            .to_string(),
        price: created.booking.price,
    }))
}
