use chrono::{Datelike, NaiveDate, Weekday};
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::request::TIME_RE;
use crate::models::{BookingProjection, BookingUpdate, RescheduleRequest};

/// Days the business does not operate.
pub fn is_closed(date: &NaiveDate) -> bool {
    date.weekday() == Weekday::Sun
}

/// Moves a booking owned by `session_phone` to a new date (and optionally a
/// new time). Checks run in order and the first failure wins; nothing is
/// written unless every check passes.
pub fn reschedule(
    conn: &Connection,
    brand_id: &str,
    session_phone: &str,
    request: &RescheduleRequest,
    today: NaiveDate,
) -> AppResult<BookingProjection> {
    let booking_id = request.booking_id.trim();
    if booking_id.is_empty() || request.new_date.trim().is_empty() {
        return Err(AppError::BadRequest(
            "bookingId and newDate are required".to_string(),
        ));
    }

    let new_date = NaiveDate::parse_from_str(request.new_date.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest("Invalid date".to_string()))?;
    let new_time = match request.new_time.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(t) if TIME_RE.is_match(t) => Some(t.to_string()),
        Some(_) => return Err(AppError::BadRequest("Invalid time".to_string())),
    };

    if new_date <= today {
        return Err(AppError::BadRequest(
            "New date must be in the future".to_string(),
        ));
    }
    if is_closed(&new_date) {
        return Err(AppError::BadRequest(
            "Service is not available on Sundays".to_string(),
        ));
    }

    let target = queries::get_for_reschedule(conn, brand_id, booking_id)?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    if target.contact != session_phone {
        tracing::warn!(booking_id, "reschedule attempted by non-owner");
        return Err(AppError::Forbidden(
            "You do not have permission to reschedule this booking".to_string(),
        ));
    }
    if !target.status.is_reschedulable() {
        return Err(AppError::BadRequest(format!(
            "Cannot reschedule a booking with status: {}",
            target.status.as_str()
        )));
    }
    if target.date <= today {
        return Err(AppError::BadRequest(
            "Cannot reschedule a past booking".to_string(),
        ));
    }

    let update = BookingUpdate {
        date: Some(new_date),
        time: new_time,
        ..Default::default()
    };
    let updated = queries::update_booking(conn, brand_id, booking_id, &update)?
        .ok_or_else(|| AppError::Internal("booking vanished during reschedule".to_string()))?;

    tracing::info!(booking_id, new_date = %new_date, "booking rescheduled");
    Ok(updated)
}
