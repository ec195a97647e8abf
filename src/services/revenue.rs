//! Revenue reporting over paid bookings.
//!
//! Fetching is separate from aggregation: `aggregate` is a pure function of
//! the rows it is handed.

use std::collections::HashMap;

use chrono::{Datelike, Duration, Months, NaiveDate};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::models::Booking;
use crate::services::promo::round_half_up;

const RECENT_LIMIT: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Week,
    Month,
    Year,
}

impl Period {
    /// Unknown or missing values fall back to `Month`.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("week") => Period::Week,
            Some("year") => Period::Year,
            _ => Period::Month,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// The period ending today. Month and year steps clamp to the last day of a
/// shorter month.
pub fn current_range(period: Period, today: NaiveDate) -> DateRange {
    let start = match period {
        Period::Week => today - Duration::days(7),
        Period::Month => today.checked_sub_months(Months::new(1)).unwrap_or(today),
        Period::Year => today.checked_sub_months(Months::new(12)).unwrap_or(today),
    };
    DateRange { start, end: today }
}

/// Same length as `current`, ending the day before it starts.
pub fn previous_range(current: &DateRange) -> DateRange {
    let length = current.end - current.start;
    let end = current.start - Duration::days(1);
    DateRange {
        start: end - length,
        end,
    }
}

/// Whole-percent change; a zero baseline reads as +100% when anything was
/// earned and 0% otherwise.
pub fn percent_change(current: i64, previous: i64) -> i64 {
    if previous == 0 {
        return if current > 0 { 100 } else { 0 };
    }
    round_half_up((current - previous) as f64 / previous as f64 * 100.0)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBreakdown {
    pub service_name: String,
    pub revenue: i64,
    pub count: i64,
    pub percentage: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimePoint {
    pub label: String,
    pub revenue: i64,
    /// Bucket key: `YYYY-MM-DD` for days and weeks, `YYYY-MM` for months.
    pub date: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueReport {
    pub period: Period,
    pub range: DateRange,
    pub previous_range: DateRange,
    pub total_revenue: i64,
    pub booking_count: i64,
    pub average_value: i64,
    pub previous_revenue: i64,
    pub previous_count: i64,
    pub revenue_change: i64,
    pub count_change: i64,
    pub top_service: Option<String>,
    pub service_breakdown: Vec<ServiceBreakdown>,
    pub time_data: Vec<TimePoint>,
    pub recent_bookings: Vec<Booking>,
}

/// Sorted by revenue, highest first; ties keep first-seen order.
pub fn by_service(bookings: &[Booking]) -> Vec<ServiceBreakdown> {
    let total: i64 = bookings.iter().map(|b| b.price).sum();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut rows: Vec<ServiceBreakdown> = vec![];

    for b in bookings {
        let i = *index.entry(b.service_name.as_str()).or_insert_with(|| {
            rows.push(ServiceBreakdown {
                service_name: b.service_name.clone(),
                revenue: 0,
                count: 0,
                percentage: 0,
            });
            rows.len() - 1
        });
        rows[i].revenue += b.price;
        rows[i].count += 1;
    }

    for row in &mut rows {
        row.percentage = if total > 0 {
            round_half_up(row.revenue as f64 / total as f64 * 100.0)
        } else {
            0
        };
    }
    rows.sort_by(|a, b| b.revenue.cmp(&a.revenue));
    rows
}

fn week_monday(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Daily buckets for a week, Monday-anchored weekly buckets for a month,
/// monthly buckets for a year. Ascending by bucket key.
pub fn by_time(bookings: &[Booking], period: Period) -> Vec<TimePoint> {
    let mut buckets: HashMap<String, (NaiveDate, i64)> = HashMap::new();

    for b in bookings {
        let (key, anchor) = match period {
            Period::Week => (b.date.format("%Y-%m-%d").to_string(), b.date),
            Period::Month => {
                let monday = week_monday(b.date);
                (monday.format("%Y-%m-%d").to_string(), monday)
            }
            Period::Year => {
                let first = b.date.with_day(1).unwrap_or(b.date);
                (b.date.format("%Y-%m").to_string(), first)
            }
        };
        buckets.entry(key).or_insert((anchor, 0)).1 += b.price;
    }

    let mut points: Vec<TimePoint> = buckets
        .into_iter()
        .map(|(date, (anchor, revenue))| {
            let label = match period {
                Period::Week => anchor.format("%a, %b %-d").to_string(),
                Period::Month => format!("Week of {}", anchor.format("%b %-d")),
                Period::Year => anchor.format("%b %y").to_string(),
            };
            TimePoint {
                label,
                revenue,
                date,
            }
        })
        .collect();
    points.sort_by(|a, b| a.date.cmp(&b.date));
    points
}

pub fn aggregate(
    period: Period,
    range: DateRange,
    current: &[Booking],
    previous: &[Booking],
    recent: Vec<Booking>,
) -> RevenueReport {
    let total_revenue: i64 = current.iter().map(|b| b.price).sum();
    let previous_revenue: i64 = previous.iter().map(|b| b.price).sum();
    let booking_count = current.len() as i64;
    let previous_count = previous.len() as i64;
    let average_value = if booking_count > 0 {
        round_half_up(total_revenue as f64 / booking_count as f64)
    } else {
        0
    };

    let service_breakdown = by_service(current);
    let top_service = service_breakdown.first().map(|s| s.service_name.clone());

    RevenueReport {
        period,
        range,
        previous_range: previous_range(&range),
        total_revenue,
        booking_count,
        average_value,
        previous_revenue,
        previous_count,
        revenue_change: percent_change(total_revenue, previous_revenue),
        count_change: percent_change(booking_count, previous_count),
        top_service,
        service_breakdown,
        time_data: by_time(current, period),
        recent_bookings: recent,
    }
}

pub fn revenue_report(
    conn: &Connection,
    brand_id: &str,
    period: Period,
    today: NaiveDate,
) -> anyhow::Result<RevenueReport> {
    let range = current_range(period, today);
    let prev = previous_range(&range);

    let current = queries::list_paid_in_range(conn, brand_id, &range.start, &range.end)?;
    let previous = queries::list_paid_in_range(conn, brand_id, &prev.start, &prev.end)?;
    let recent = queries::list_recent_paid(conn, brand_id, RECENT_LIMIT)?;

    Ok(aggregate(period, range, &current, &previous, recent))
}
