use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub brand_id: String,
    pub client_name: String,
    pub service_name: String,
    pub price: i64,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub contact: String,
    pub transaction_id: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub reminder_sent: bool,
    pub promo_code: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Insert payload. The tenant id and creation timestamp are attached by the
/// repository, never by the caller.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub id: String,
    pub client_name: String,
    pub service_name: String,
    pub price: i64,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub contact: String,
    pub transaction_id: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub promo_code: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BookingUpdate {
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub status: Option<BookingStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub notes: Option<String>,
}

impl BookingUpdate {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.time.is_none()
            && self.status.is_none()
            && self.payment_status.is_none()
            && self.notes.is_none()
    }
}

/// What clients get to see about a booking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingProjection {
    pub id: String,
    pub service_name: String,
    pub price: i64,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub status: BookingStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactBooking {
    pub id: String,
    pub client_name: String,
    pub service_name: String,
    pub price: i64,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub created_at: NaiveDateTime,
}

impl From<ContactBooking> for BookingProjection {
    fn from(b: ContactBooking) -> Self {
        Self {
            id: b.id,
            service_name: b.service_name,
            price: b.price,
            date: b.date,
            time: b.time,
            status: b.status,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RescheduleTarget {
    pub id: String,
    pub contact: String,
    pub status: BookingStatus,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Lenient parse for stored rows; unknown values read as pending.
    pub fn parse(s: &str) -> Self {
        s.parse().unwrap_or(BookingStatus::Pending)
    }

    pub fn is_reschedulable(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Pending,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Self {
        s.parse().unwrap_or(PaymentStatus::Unpaid)
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}
