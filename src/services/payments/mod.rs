pub mod stripe;
pub mod webhook;

use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use rusqlite::Connection;
use serde::{Deserialize, Deserializer};

use crate::config::AppConfig;
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::{catalog, Booking, BookingStatus, CreateCheckoutRequest, NewBooking, PaymentStatus};
use crate::services::booking::{generate_booking_id, persist_booking};
use crate::services::{phone, promo};

const UNKNOWN_PACKAGE: &str = "Unknown Package";

/// A single-item hosted checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub package_id: String,
    pub product_name: String,
    pub description: String,
    pub unit_amount_cents: i64,
    pub customer_email: Option<String>,
    pub metadata: Vec<(String, String)>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> anyhow::Result<CheckoutSession>;
}

/// Prices the package from the catalog; nothing about the amount is taken
/// from the caller.
pub fn build_checkout(config: &AppConfig, input: &CreateCheckoutRequest) -> AppResult<CheckoutRequest> {
    let pkg = catalog::find_package(input.package_id.trim())
        .ok_or_else(|| AppError::BadRequest("Invalid package selected".to_string()))?;

    let unit_price = promo::promo_price(pkg.avg_price, config.promo_discount_percent);
    let booking_data = serde_json::to_string(&input.booking_data)
        .map_err(|e| AppError::Internal(format!("failed to encode booking data: {e}")))?;
    let base = config.public_base_url.trim_end_matches('/');

    Ok(CheckoutRequest {
        package_id: pkg.id.to_string(),
        product_name: format!("{} - Mobile Detailing", pkg.name),
        description: format!("{}. Service at your location.", pkg.includes.join(", ")),
        unit_amount_cents: unit_price * 100,
        customer_email: input
            .customer_email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string),
        metadata: vec![
            ("package_id".to_string(), pkg.id.to_string()),
            ("customer_name".to_string(), input.customer_name.clone()),
            ("customer_phone".to_string(), input.customer_phone.clone()),
            ("booking_data".to_string(), booking_data),
        ],
        success_url: format!("{base}/book/success?session_id={{CHECKOUT_SESSION_ID}}"),
        cancel_url: format!("{base}/book?cancelled=true"),
    })
}

// ── Webhook events ──

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletedCheckout {
    pub id: String,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

/// The booking form as it was serialized into checkout metadata.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutBookingData {
    pub service: CheckoutService,
    pub vehicle: CheckoutVehicle,
    pub schedule: CheckoutSchedule,
    pub address: CheckoutAddress,
    pub contact: CheckoutContact,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CheckoutService {
    pub package_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutVehicle {
    #[serde(deserialize_with = "string_or_number")]
    pub year: String,
    pub make: String,
    pub model: String,
    pub color: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutSchedule {
    pub date: String,
    pub time: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutContact {
    pub name: String,
    pub phone: String,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub fn checkout_notes(data: &CheckoutBookingData) -> String {
    let v = &data.vehicle;
    let a = &data.address;
    let mut lines = vec![format!("Vehicle: {} {} {}", v.year, v.make, v.model)];
    if let Some(color) = non_empty(&v.color) {
        lines.push(format!("Color: {color}"));
    }
    if let Some(notes) = non_empty(&v.notes) {
        lines.push(format!("Notes: {notes}"));
    }
    lines.push(format!("Address: {}, {}, {} {}", a.street, a.city, a.state, a.zip));
    if let Some(instructions) = non_empty(&a.instructions) {
        lines.push(format!("Instructions: {instructions}"));
    }
    lines.join("\n")
}

/// Turns a completed checkout into a confirmed, paid booking and marks the
/// payer's profile verified. The price is what the provider charged.
///
/// `Ok(None)` means the insert failed and was logged.
pub fn record_paid_checkout(
    conn: &Connection,
    brand_id: &str,
    session: &CompletedCheckout,
) -> anyhow::Result<Option<Booking>> {
    let metadata = session
        .metadata
        .as_ref()
        .context("no metadata in checkout session")?;
    let raw = metadata
        .get("booking_data")
        .filter(|s| !s.is_empty())
        .context("no booking data in checkout session metadata")?;
    let data: CheckoutBookingData =
        serde_json::from_str(raw).context("booking data in checkout metadata is malformed")?;

    let meta = |key: &str| metadata.get(key).map(|s| s.trim()).filter(|s| !s.is_empty());
    let contact = phone::normalize_phone(meta("customer_phone").unwrap_or(&data.contact.phone));
    let client_name = meta("customer_name").unwrap_or(data.contact.name.trim()).to_string();

    let date = chrono::NaiveDate::parse_from_str(data.schedule.date.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid schedule date {:?}", data.schedule.date))?;

    queries::upsert_client_profile(conn, brand_id, &contact, &client_name, Some(true))?;

    let service_name = catalog::find_package(&data.service.package_id)
        .map(|p| p.name)
        .unwrap_or(UNKNOWN_PACKAGE);
    let time = data.schedule.time.trim();

    let booking = NewBooking {
        id: generate_booking_id(&date),
        client_name,
        service_name: service_name.to_string(),
        price: session.amount_total.unwrap_or(0) / 100,
        date,
        time: (!time.is_empty()).then(|| time.to_string()),
        contact,
        transaction_id: Some(session.id.clone()),
        payment_method: Some("stripe".to_string()),
        notes: Some(checkout_notes(&data)),
        status: BookingStatus::Confirmed,
        payment_status: PaymentStatus::Paid,
        promo_code: None,
    };

    let stored = persist_booking(conn, brand_id, booking);
    if let Some(b) = &stored {
        tracing::info!(booking_id = %b.id, session_id = %session.id, price = b.price, "paid booking recorded");
    }
    Ok(stored)
}
