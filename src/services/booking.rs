//! Booking creation: validate, price from the catalog, persist, then hand the
//! caller what it needs to notify.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use rusqlite::Connection;
use validator::Validate;

use crate::config::AppConfig;
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::catalog::{self, PromoOffer};
use crate::models::request::AddressInput;
use crate::models::{
    Booking, BookingStatus, CreateBookingRequest, NewBooking, PaymentStatus, PromoBookingRequest,
};
use crate::services::notifications::{BookingNotice, NoticeAddress};
use crate::services::{phone, promo};

/// Returned as the booking id when the insert did not go through.
pub const PENDING_BOOKING_ID: &str = "pending";
const MAX_ID_RETRIES: usize = 3;
const VEHICLE_PENDING: &str = "Vehicle info pending";
const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

static ZIP_IN_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{5}").unwrap());

/// `BK-YYYYMMDD-XXXX` with a random uppercase base-36 suffix. Not unique on
/// its own; see `persist_booking`.
pub fn generate_booking_id(date: &NaiveDate) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..4)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("BK-{}-{suffix}", date.format("%Y%m%d"))
}

pub fn compose_notes(address: &AddressInput) -> String {
    let mut lines = vec![format!(
        "Address: {}, {}, {} {}",
        address.street, address.city, address.state, address.zip
    )];
    if let Some(instructions) = address
        .instructions
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        lines.push(format!("Instructions: {instructions}"));
    }
    lines.push(VEHICLE_PENDING.to_string());
    lines.join("\n")
}

/// Inserts the booking, drawing a fresh id suffix when the id collides.
/// `None` means nothing was stored; the cause has been logged.
pub fn persist_booking(conn: &Connection, brand_id: &str, booking: NewBooking) -> Option<Booking> {
    let mut booking = booking;
    for attempt in 0..=MAX_ID_RETRIES {
        match queries::insert_booking(conn, brand_id, &booking) {
            Ok(stored) => return Some(stored),
            Err(e) if queries::is_constraint_violation(&e) && attempt < MAX_ID_RETRIES => {
                tracing::warn!(booking_id = %booking.id, attempt, "booking id collision, retrying");
                booking.id = generate_booking_id(&booking.date);
            }
            Err(e) => {
                tracing::error!(booking_id = %booking.id, error = %e, "failed to persist booking");
                return None;
            }
        }
    }
    None
}

#[derive(Debug, Clone)]
pub struct CreatedBooking {
    /// The stored id, or `PENDING_BOOKING_ID` when persistence failed.
    pub booking_id: String,
    pub persisted: bool,
    pub promo_applied: bool,
    pub price: i64,
    pub notice: BookingNotice,
}

pub fn create_booking(
    conn: &Connection,
    config: &AppConfig,
    request: &CreateBookingRequest,
) -> AppResult<CreatedBooking> {
    request.validate()?;

    let service = catalog::resolve_service(request.service.id.trim())
        .ok_or_else(|| AppError::field("service.id", "Please select a valid service"))?;
    let date = request
        .schedule
        .parsed_date()
        .ok_or_else(|| AppError::field("schedule.date", "Invalid date"))?;
    let contact = phone::normalize_phone(&request.contact.phone);

    let promo_applied = config.promo_enabled
        && promo::is_first_time_client(conn, &config.brand_id, &contact).unwrap_or_else(|e| {
            tracing::error!(error = %e, "promo eligibility check failed, charging full price");
            false
        });
    let price = if promo_applied {
        promo::promo_price(service.price, config.promo_discount_percent)
    } else {
        service.price
    };

    let new_booking = NewBooking {
        id: generate_booking_id(&date),
        client_name: request.contact.name.trim().to_string(),
        service_name: service.name.to_string(),
        price,
        date,
        time: Some(request.schedule.time.clone()),
        contact: contact.clone(),
        transaction_id: None,
        payment_method: None,
        notes: Some(compose_notes(&request.address)),
        status: BookingStatus::Pending,
        payment_status: PaymentStatus::Unpaid,
        promo_code: promo_applied.then(|| format!("FIRST{}", config.promo_discount_percent)),
    };

    let stored = persist_booking(conn, &config.brand_id, new_booking);
    let (booking_id, persisted) = match &stored {
        Some(b) => {
            tracing::info!(booking_id = %b.id, price, promo_applied, "booking created");
            (b.id.clone(), true)
        }
        None => (PENDING_BOOKING_ID.to_string(), false),
    };

    let notice = BookingNotice {
        service_name: service.name.to_string(),
        price,
        date: Some(date),
        time: Some(request.schedule.time.clone()),
        address: NoticeAddress {
            street: request.address.street.clone(),
            city: request.address.city.clone(),
            state: request.address.state.clone(),
            zip: request.address.zip.clone(),
        },
        customer_name: request.contact.name.trim().to_string(),
        phone: contact,
        email: request.contact.email().map(str::to_string),
    };

    Ok(CreatedBooking {
        booking_id,
        persisted,
        promo_applied,
        price,
        notice,
    })
}

/// Free-text promo addresses are `street, city, zip`.
pub fn parse_promo_address(address: &str) -> NoticeAddress {
    let parts: Vec<&str> = address.split(',').map(str::trim).collect();
    let part = |i: usize| parts.get(i).copied().filter(|s| !s.is_empty());

    NoticeAddress {
        street: part(0).unwrap_or(address.trim()).to_string(),
        city: part(1).unwrap_or("Weston").to_string(),
        state: "FL".to_string(),
        zip: part(2)
            .and_then(|p| ZIP_IN_TEXT.find(p))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "33326".to_string()),
    }
}

#[derive(Debug, Clone)]
pub struct PromoBooking {
    pub booking: Booking,
    pub offer: &'static PromoOffer,
    pub notice: BookingNotice,
}

pub fn create_promo_booking(
    conn: &Connection,
    config: &AppConfig,
    request: &PromoBookingRequest,
    today: NaiveDate,
) -> AppResult<PromoBooking> {
    request.validate()?;

    let code = request.promo_code.trim().to_lowercase();
    let offer = catalog::find_promo_offer(&code)
        .ok_or_else(|| AppError::BadRequest("Invalid promo code".to_string()))?;

    let upgrades: Vec<_> = request
        .upgrades
        .iter()
        .filter_map(|id| catalog::find_upgrade(id))
        .collect();
    let total = offer.price + upgrades.iter().map(|u| u.price).sum::<i64>();
    let service_name = if upgrades.is_empty() {
        offer.name.to_string()
    } else {
        let names: Vec<&str> = upgrades.iter().map(|u| u.name).collect();
        format!("{} + {}", offer.name, names.join(", "))
    };

    let contact = phone::normalize_phone(&request.phone);
    let address = parse_promo_address(&request.address);
    let notes = [
        format!(
            "Address: {}, {}, {} {}",
            address.street, address.city, address.state, address.zip
        ),
        format!("Promo: {code}"),
        format!("Email: {}", request.email.trim()),
        format!("{VEHICLE_PENDING} - will contact to schedule"),
    ]
    .join("\n");

    let new_booking = NewBooking {
        id: generate_booking_id(&today),
        client_name: request.name.trim().to_string(),
        service_name: service_name.clone(),
        price: total,
        date: today,
        time: None,
        contact: contact.clone(),
        transaction_id: None,
        payment_method: None,
        notes: Some(notes),
        status: BookingStatus::Pending,
        payment_status: if total == 0 {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Unpaid
        },
        promo_code: Some(code),
    };

    let booking = persist_booking(conn, &config.brand_id, new_booking)
        .ok_or_else(|| AppError::Internal("failed to persist promo booking".to_string()))?;
    tracing::info!(booking_id = %booking.id, total, "promo booking created");

    let notice = BookingNotice {
        service_name,
        price: total,
        date: None,
        time: None,
        address,
        customer_name: request.name.trim().to_string(),
        phone: contact,
        email: Some(request.email.trim().to_string()),
    };

    Ok(PromoBooking {
        booking,
        offer,
        notice,
    })
}
