use std::collections::BTreeMap;

use chrono::{Datelike, Duration, Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::models::Booking;

static MONTH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub todays_bookings: i64,
    pub week_revenue: i64,
    pub pending_bookings: i64,
}

/// Sunday on or before `today`.
pub fn week_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(i64::from(today.weekday().num_days_from_sunday()))
}

pub fn stats(conn: &Connection, brand_id: &str, today: NaiveDate) -> anyhow::Result<DashboardStats> {
    Ok(DashboardStats {
        todays_bookings: queries::count_on_date(conn, brand_id, &today)?,
        week_revenue: queries::sum_revenue(conn, brand_id, &week_start(today), &today)?,
        pending_bookings: queries::count_pending_payment(conn, brand_id)?,
    })
}

// ── Calendar ──

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarMonth {
    pub current_month: String,
    /// Keyed by `YYYY-MM-DD`, ascending.
    pub bookings: BTreeMap<String, Vec<Booking>>,
}

/// First and last day of the requested `YYYY-MM`; anything unparseable
/// means the month containing `today`.
pub fn month_range(month: Option<&str>, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = month
        .filter(|m| MONTH_RE.is_match(m))
        .and_then(|m| NaiveDate::parse_from_str(&format!("{m}-01"), "%Y-%m-%d").ok())
        .or_else(|| today.with_day(1))
        .unwrap_or(today);
    let last = first
        .checked_add_months(Months::new(1))
        .map(|next| next - Duration::days(1))
        .unwrap_or(first);
    (first, last)
}

pub fn calendar_month(
    conn: &Connection,
    brand_id: &str,
    month: Option<&str>,
    today: NaiveDate,
) -> anyhow::Result<CalendarMonth> {
    let (first, last) = month_range(month, today);
    let rows = queries::list_by_month(conn, brand_id, &first, &last)?;

    let mut bookings: BTreeMap<String, Vec<Booking>> = BTreeMap::new();
    for b in rows {
        bookings
            .entry(b.date.format("%Y-%m-%d").to_string())
            .or_default()
            .push(b);
    }

    Ok(CalendarMonth {
        current_month: first.format("%Y-%m").to_string(),
        bookings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{BookingStatus, NewBooking, PaymentStatus};

    const BRAND: &str = "brand-a";

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn seed(conn: &Connection, brand: &str, id: &str, on: &str, price: i64, payment: PaymentStatus) {
        queries::insert_booking(
            conn,
            brand,
            &NewBooking {
                id: id.to_string(),
                client_name: "Alice".to_string(),
                service_name: "Showroom".to_string(),
                price,
                date: date(on),
                time: Some("10:00".to_string()),
                contact: "9545551234".to_string(),
                transaction_id: None,
                payment_method: None,
                notes: None,
                status: BookingStatus::Confirmed,
                payment_status: payment,
                promo_code: None,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_week_starts_on_sunday() {
        assert_eq!(week_start(date("2025-06-18")), date("2025-06-15"));
        assert_eq!(week_start(date("2025-06-15")), date("2025-06-15"));
    }

    #[test]
    fn test_stats() {
        let conn = db::init_db(":memory:").unwrap();
        seed(&conn, BRAND, "BK-1", "2025-06-18", 285, PaymentStatus::Paid);
        seed(&conn, BRAND, "BK-2", "2025-06-15", 60, PaymentStatus::Paid);
        seed(&conn, BRAND, "BK-3", "2025-06-14", 175, PaymentStatus::Paid);
        seed(&conn, BRAND, "BK-4", "2025-06-18", 99, PaymentStatus::Pending);
        seed(&conn, "brand-b", "BK-5", "2025-06-18", 500, PaymentStatus::Pending);

        let s = stats(&conn, BRAND, date("2025-06-18")).unwrap();
        assert_eq!(
            s,
            DashboardStats {
                todays_bookings: 2,
                week_revenue: 345,
                pending_bookings: 1,
            }
        );
    }

    #[test]
    fn test_month_range() {
        let today = date("2025-06-18");
        assert_eq!(month_range(Some("2024-02"), today), (date("2024-02-01"), date("2024-02-29")));
        assert_eq!(month_range(Some("2025-12"), today), (date("2025-12-01"), date("2025-12-31")));
        assert_eq!(month_range(None, today), (date("2025-06-01"), date("2025-06-30")));
        assert_eq!(month_range(Some("2025-13"), today), (date("2025-06-01"), date("2025-06-30")));
        assert_eq!(month_range(Some("june"), today), (date("2025-06-01"), date("2025-06-30")));
    }

    #[test]
    fn test_calendar_groups_by_day() {
        let conn = db::init_db(":memory:").unwrap();
        seed(&conn, BRAND, "BK-1", "2025-06-20", 285, PaymentStatus::Unpaid);
        seed(&conn, BRAND, "BK-2", "2025-06-03", 60, PaymentStatus::Paid);
        seed(&conn, BRAND, "BK-3", "2025-06-20", 175, PaymentStatus::Paid);
        seed(&conn, BRAND, "BK-4", "2025-07-01", 175, PaymentStatus::Paid);

        let cal = calendar_month(&conn, BRAND, Some("2025-06"), date("2025-01-01")).unwrap();
        assert_eq!(cal.current_month, "2025-06");
        let days: Vec<&String> = cal.bookings.keys().collect();
        assert_eq!(days, vec!["2025-06-03", "2025-06-20"]);
        assert_eq!(cal.bookings["2025-06-20"].len(), 2);
    }
}
