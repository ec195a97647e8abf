use rusqlite::Connection;

use crate::db::queries;
use crate::services::phone;

/// Rounds halves toward positive infinity.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

pub fn promo_price(price: i64, discount_percent: u32) -> i64 {
    round_half_up(price as f64 * (1.0 - f64::from(discount_percent) / 100.0))
}

/// True when the phone has no booking history for this tenant.
///
/// Rows written before phones were canonicalized carry a `+1` prefix, so
/// both forms are checked. Inputs that do not normalize to ten digits are
/// never eligible.
pub fn is_first_time_client(
    conn: &Connection,
    brand_id: &str,
    raw_phone: &str,
) -> anyhow::Result<bool> {
    let canonical = phone::normalize_phone(raw_phone);
    if !phone::is_canonical(&canonical) {
        return Ok(false);
    }

    let legacy = format!("+1{canonical}");
    let count = queries::count_bookings_for_contacts(conn, brand_id, &canonical, &legacy)?;
    Ok(count == 0)
}
