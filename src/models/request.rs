use std::borrow::Cow;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use validator::{Validate, ValidationError};

static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
pub(crate) static TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").unwrap());
static ZIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{5}$").unwrap());

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut e = ValidationError::new(code);
    e.message = Some(Cow::Borrowed(message));
    e
}

fn validate_calendar_date(value: &str) -> Result<(), ValidationError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| error("date", "Invalid date"))
}

fn validate_phone_digits(value: &str) -> Result<(), ValidationError> {
    if value.chars().filter(char::is_ascii_digit).count() >= 10 {
        Ok(())
    } else {
        Err(error("phone", "Phone number must have at least 10 digits"))
    }
}

fn validate_email_or_empty(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || validator::validate_email(value) {
        Ok(())
    } else {
        Err(error("email", "Invalid email"))
    }
}

// ── Booking creation ──

/// Unknown fields, including any client-side price or service name, are
/// ignored during deserialization.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CreateBookingRequest {
    #[validate]
    pub service: ServiceSelection,
    #[validate]
    pub schedule: ScheduleInput,
    #[validate]
    pub address: AddressInput,
    #[validate]
    pub contact: ContactInput,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ServiceSelection {
    #[validate(length(min = 1, message = "Please select a service"))]
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ScheduleInput {
    #[validate(
        regex(path = "DATE_RE", message = "Date must be YYYY-MM-DD"),
        custom = "validate_calendar_date"
    )]
    pub date: String,
    #[validate(regex(path = "TIME_RE", message = "Time must be HH:MM"))]
    pub time: String,
}

impl ScheduleInput {
    /// Only meaningful after validation.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct AddressInput {
    #[validate(length(min = 5, message = "Street address is required"))]
    pub street: String,
    #[validate(length(min = 2, message = "City is required"))]
    pub city: String,
    #[validate(length(equal = 2, message = "Use 2-letter state code"))]
    pub state: String,
    #[validate(regex(path = "ZIP_RE", message = "Invalid ZIP code"))]
    pub zip: String,
    #[validate(length(max = 300, message = "Instructions must be under 300 characters"))]
    pub instructions: Option<String>,
}

impl Default for AddressInput {
    fn default() -> Self {
        Self {
            street: String::new(),
            city: String::new(),
            state: "FL".to_string(),
            zip: String::new(),
            instructions: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ContactInput {
    #[validate(length(min = 2, message = "Name is required"))]
    pub name: String,
    #[validate(custom = "validate_phone_digits")]
    pub phone: String,
    #[validate(custom = "validate_email_or_empty")]
    pub email: Option<String>,
}

impl ContactInput {
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}

// ── Promo-code booking ──

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct PromoBookingRequest {
    #[validate(length(min = 1, message = "Promo code is required"))]
    pub promo_code: String,
    #[validate(length(min = 2, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 10, message = "Phone number is required"))]
    pub phone: String,
    #[validate(length(min = 5, message = "Address is required"))]
    pub address: String,
    pub upgrades: Vec<String>,
}

// ── Hosted checkout ──

/// `bookingData` is carried through to the payment provider untouched and
/// read back when the checkout completes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    pub package_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub booking_data: serde_json::Value,
}

// ── Reschedule ──

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RescheduleRequest {
    pub booking_id: String,
    pub new_date: String,
    pub new_time: Option<String>,
}
