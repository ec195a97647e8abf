use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, ErrorCode};

use crate::models::{
    AdminUser, Booking, BookingProjection, BookingStatus, BookingUpdate, ClientProfile,
    ContactBooking, NewBooking, PaymentStatus, RescheduleTarget,
};

const DATE_FMT: &str = "%Y-%m-%d";
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

const BOOKING_COLUMNS: &str = "id, brand_id, client_name, service_name, price, date, time, contact, \
     transaction_id, payment_method, notes, status, payment_status, reminder_sent, promo_code, created_at";

fn fmt_date(date: &NaiveDate) -> String {
    date.format(DATE_FMT).to_string()
}

fn fmt_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FMT).to_string()
}

fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FMT).with_context(|| format!("invalid stored date: {s}"))
}

fn parse_datetime(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT).unwrap_or_else(|_| Utc::now().naive_utc())
}

/// True when the error chain bottoms out in a SQLite constraint violation.
pub fn is_constraint_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<rusqlite::Error>(),
            Some(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation
        )
    })
}

/// Escapes LIKE wildcards so user search text matches literally.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

// ── Bookings ──

pub fn insert_booking(
    conn: &Connection,
    brand_id: &str,
    booking: &NewBooking,
) -> anyhow::Result<Booking> {
    let sql = format!(
        "INSERT INTO bookings (id, brand_id, client_name, service_name, price, date, time, contact, \
         transaction_id, payment_method, notes, status, payment_status, promo_code)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         RETURNING {BOOKING_COLUMNS}"
    );

    let row = conn.query_row(
        &sql,
        params![
            booking.id,
            brand_id,
            booking.client_name,
            booking.service_name,
            booking.price,
            fmt_date(&booking.date),
            booking.time,
            booking.contact,
            booking.transaction_id,
            booking.payment_method,
            booking.notes,
            booking.status.as_str(),
            booking.payment_status.as_str(),
            booking.promo_code,
        ],
        |row| Ok(parse_booking_row(row)),
    )?;
    row
}

pub fn get_booking_by_id(
    conn: &Connection,
    brand_id: &str,
    id: &str,
) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1 AND brand_id = ?2");
    let result = conn.query_row(&sql, params![id, brand_id], |row| {
        Ok(parse_booking_row(row))
    });

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_for_reschedule(
    conn: &Connection,
    brand_id: &str,
    id: &str,
) -> anyhow::Result<Option<RescheduleTarget>> {
    let result = conn.query_row(
        "SELECT id, contact, status, date FROM bookings WHERE id = ?1 AND brand_id = ?2",
        params![id, brand_id],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        },
    );

    match result {
        Ok((id, contact, status, date)) => Ok(Some(RescheduleTarget {
            id,
            contact,
            status: BookingStatus::parse(&status),
            date: parse_date(&date)?,
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Number of bookings stored under any of the given contact values.
pub fn count_bookings_for_contacts(
    conn: &Connection,
    brand_id: &str,
    canonical: &str,
    legacy: &str,
) -> anyhow::Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE brand_id = ?1 AND (contact = ?2 OR contact = ?3)",
        params![brand_id, canonical, legacy],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn list_by_contact(
    conn: &Connection,
    brand_id: &str,
    phone: &str,
    statuses: &[BookingStatus],
) -> anyhow::Result<Vec<ContactBooking>> {
    if statuses.is_empty() {
        return Ok(vec![]);
    }

    let placeholders: Vec<String> = (0..statuses.len()).map(|i| format!("?{}", i + 3)).collect();
    let sql = format!(
        "SELECT id, client_name, service_name, price, date, time, status, payment_status, created_at
         FROM bookings WHERE brand_id = ?1 AND contact = ?2 AND status IN ({})
         ORDER BY date ASC, time ASC, id ASC",
        placeholders.join(", ")
    );

    let mut params_vec: Vec<Box<dyn ToSql>> = vec![
        Box::new(brand_id.to_string()),
        Box::new(phone.to_string()),
    ];
    for status in statuses {
        params_vec.push(Box::new(status.as_str()));
    }
    let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_refs.as_slice(), |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, String>(7)?,
            row.get::<_, String>(8)?,
        ))
    })?;

    let mut bookings = vec![];
    for row in rows {
        let (id, client_name, service_name, price, date, time, status, payment_status, created_at) =
            row?;
        bookings.push(ContactBooking {
            id,
            client_name,
            service_name,
            price,
            date: parse_date(&date)?,
            time,
            status: BookingStatus::parse(&status),
            payment_status: PaymentStatus::parse(&payment_status),
            created_at: parse_datetime(&created_at),
        });
    }
    Ok(bookings)
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilters {
    pub status: Option<BookingStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub search: Option<String>,
}

pub fn list_bookings(
    conn: &Connection,
    brand_id: &str,
    filters: &BookingFilters,
) -> anyhow::Result<Vec<Booking>> {
    let mut conditions = vec!["brand_id = ?1".to_string()];
    let mut params_vec: Vec<Box<dyn ToSql>> = vec![Box::new(brand_id.to_string())];

    if let Some(status) = filters.status {
        params_vec.push(Box::new(status.as_str()));
        conditions.push(format!("status = ?{}", params_vec.len()));
    }
    if let Some(from) = &filters.from {
        params_vec.push(Box::new(fmt_date(from)));
        conditions.push(format!("date >= ?{}", params_vec.len()));
    }
    if let Some(to) = &filters.to {
        params_vec.push(Box::new(fmt_date(to)));
        conditions.push(format!("date <= ?{}", params_vec.len()));
    }
    if let Some(search) = filters.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        params_vec.push(Box::new(like_pattern(search)));
        let n = params_vec.len();
        conditions.push(format!(
            "(client_name LIKE ?{n} ESCAPE '\\' COLLATE NOCASE OR contact LIKE ?{n} ESCAPE '\\' COLLATE NOCASE)"
        ));
    }

    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE {} ORDER BY date DESC, time DESC, id DESC",
        conditions.join(" AND ")
    );
    query_bookings(conn, &sql, &params_vec)
}

/// Calendar view: inclusive range, ascending so days read top to bottom.
pub fn list_by_month(
    conn: &Connection,
    brand_id: &str,
    from: &NaiveDate,
    to: &NaiveDate,
) -> anyhow::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE brand_id = ?1 AND date >= ?2 AND date <= ?3
         ORDER BY date ASC, time ASC, id ASC"
    );
    let params_vec: Vec<Box<dyn ToSql>> = vec![
        Box::new(brand_id.to_string()),
        Box::new(fmt_date(from)),
        Box::new(fmt_date(to)),
    ];
    query_bookings(conn, &sql, &params_vec)
}

pub fn list_paid_in_range(
    conn: &Connection,
    brand_id: &str,
    from: &NaiveDate,
    to: &NaiveDate,
) -> anyhow::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE brand_id = ?1 AND payment_status = 'paid' AND date >= ?2 AND date <= ?3
         ORDER BY date DESC, time DESC, id DESC"
    );
    let params_vec: Vec<Box<dyn ToSql>> = vec![
        Box::new(brand_id.to_string()),
        Box::new(fmt_date(from)),
        Box::new(fmt_date(to)),
    ];
    query_bookings(conn, &sql, &params_vec)
}

pub fn list_recent_paid(
    conn: &Connection,
    brand_id: &str,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE brand_id = ?1 AND payment_status = 'paid'
         ORDER BY date DESC, time DESC, id DESC LIMIT ?2"
    );
    let params_vec: Vec<Box<dyn ToSql>> = vec![Box::new(brand_id.to_string()), Box::new(limit)];
    query_bookings(conn, &sql, &params_vec)
}

pub fn sum_revenue(
    conn: &Connection,
    brand_id: &str,
    from: &NaiveDate,
    to: &NaiveDate,
) -> anyhow::Result<i64> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(price), 0) FROM bookings
         WHERE brand_id = ?1 AND payment_status = 'paid' AND date >= ?2 AND date <= ?3",
        params![brand_id, fmt_date(from), fmt_date(to)],
        |row| row.get(0),
    )?;
    Ok(total)
}

pub fn count_on_date(conn: &Connection, brand_id: &str, date: &NaiveDate) -> anyhow::Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE brand_id = ?1 AND date = ?2",
        params![brand_id, fmt_date(date)],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn count_pending_payment(conn: &Connection, brand_id: &str) -> anyhow::Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE brand_id = ?1 AND payment_status = 'pending'",
        params![brand_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn update_booking(
    conn: &Connection,
    brand_id: &str,
    id: &str,
    update: &BookingUpdate,
) -> anyhow::Result<Option<BookingProjection>> {
    let mut sets = vec![];
    let mut params_vec: Vec<Box<dyn ToSql>> = vec![];

    if let Some(date) = &update.date {
        params_vec.push(Box::new(fmt_date(date)));
        sets.push(format!("date = ?{}", params_vec.len()));
    }
    if let Some(time) = &update.time {
        params_vec.push(Box::new(time.clone()));
        sets.push(format!("time = ?{}", params_vec.len()));
    }
    if let Some(status) = update.status {
        params_vec.push(Box::new(status.as_str()));
        sets.push(format!("status = ?{}", params_vec.len()));
    }
    if let Some(payment_status) = update.payment_status {
        params_vec.push(Box::new(payment_status.as_str()));
        sets.push(format!("payment_status = ?{}", params_vec.len()));
    }
    if let Some(notes) = &update.notes {
        params_vec.push(Box::new(notes.clone()));
        sets.push(format!("notes = ?{}", params_vec.len()));
    }

    if sets.is_empty() {
        return get_booking_by_id(conn, brand_id, id).map(|b| {
            b.map(|b| BookingProjection {
                id: b.id,
                service_name: b.service_name,
                price: b.price,
                date: b.date,
                time: b.time,
                status: b.status,
            })
        });
    }

    params_vec.push(Box::new(id.to_string()));
    let id_idx = params_vec.len();
    params_vec.push(Box::new(brand_id.to_string()));
    let brand_idx = params_vec.len();

    let sql = format!(
        "UPDATE bookings SET {} WHERE id = ?{id_idx} AND brand_id = ?{brand_idx}
         RETURNING id, service_name, price, date, time, status",
        sets.join(", ")
    );
    let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

    let result = conn.query_row(&sql, params_refs.as_slice(), |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, String>(5)?,
        ))
    });

    match result {
        Ok((id, service_name, price, date, time, status)) => Ok(Some(BookingProjection {
            id,
            service_name,
            price,
            date: parse_date(&date)?,
            time,
            status: BookingStatus::parse(&status),
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn query_bookings(
    conn: &Connection,
    sql: &str,
    params_vec: &[Box<dyn ToSql>],
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(sql)?;
    let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let date_str: String = row.get(5)?;
    let status_str: String = row.get(11)?;
    let payment_status_str: String = row.get(12)?;
    let created_at_str: String = row.get(15)?;

    Ok(Booking {
        id: row.get(0)?,
        brand_id: row.get(1)?,
        client_name: row.get(2)?,
        service_name: row.get(3)?,
        price: row.get(4)?,
        date: parse_date(&date_str)?,
        time: row.get(6)?,
        contact: row.get(7)?,
        transaction_id: row.get(8)?,
        payment_method: row.get(9)?,
        notes: row.get(10)?,
        status: BookingStatus::parse(&status_str),
        payment_status: PaymentStatus::parse(&payment_status_str),
        reminder_sent: row.get::<_, i32>(13)? != 0,
        promo_code: row.get(14)?,
        created_at: parse_datetime(&created_at_str),
    })
}

// ── Client Profiles ──

/// Inserts or refreshes a profile keyed by phone. `verified: None` keeps the
/// stored flag.
pub fn upsert_client_profile(
    conn: &Connection,
    brand_id: &str,
    phone: &str,
    name: &str,
    verified: Option<bool>,
) -> anyhow::Result<ClientProfile> {
    let id = uuid::Uuid::new_v4().to_string();
    let profile = conn.query_row(
        "INSERT INTO client_profiles (id, brand_id, phone, name, verified)
         VALUES (?1, ?2, ?3, ?4, COALESCE(?5, 0))
         ON CONFLICT(phone) DO UPDATE SET
           name = excluded.name,
           verified = COALESCE(?5, client_profiles.verified),
           updated_at = datetime('now')
         RETURNING id, brand_id, phone, name, verified, created_at, updated_at",
        params![id, brand_id, phone, name, verified.map(i32::from)],
        |row| {
            Ok(ClientProfile {
                id: row.get(0)?,
                brand_id: row.get(1)?,
                phone: row.get(2)?,
                name: row.get(3)?,
                verified: row.get::<_, i32>(4)? != 0,
                created_at: parse_datetime(&row.get::<_, String>(5)?),
                updated_at: parse_datetime(&row.get::<_, String>(6)?),
            })
        },
    )?;
    Ok(profile)
}

pub fn get_client_profile(
    conn: &Connection,
    brand_id: &str,
    phone: &str,
) -> anyhow::Result<Option<ClientProfile>> {
    let result = conn.query_row(
        "SELECT id, brand_id, phone, name, verified, created_at, updated_at
         FROM client_profiles WHERE phone = ?1 AND brand_id = ?2",
        params![phone, brand_id],
        |row| {
            Ok(ClientProfile {
                id: row.get(0)?,
                brand_id: row.get(1)?,
                phone: row.get(2)?,
                name: row.get(3)?,
                verified: row.get::<_, i32>(4)? != 0,
                created_at: parse_datetime(&row.get::<_, String>(5)?),
                updated_at: parse_datetime(&row.get::<_, String>(6)?),
            })
        },
    );

    match result {
        Ok(profile) => Ok(Some(profile)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ── Admin Users & Sessions ──

pub fn create_user(conn: &Connection, email: &str, password_hash: &str) -> anyhow::Result<String> {
    let id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO users (id, email, password_hash) VALUES (?1, ?2, ?3)",
        params![id, email, password_hash],
    )?;
    Ok(id)
}

pub fn add_admin(conn: &Connection, user_id: &str, brand_id: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO admin_users (id, user_id, brand_id) VALUES (?1, ?2, ?3)",
        params![uuid::Uuid::new_v4().to_string(), user_id, brand_id],
    )?;
    Ok(())
}

pub struct UserCredentials {
    pub id: String,
    pub password_hash: String,
    pub is_active: bool,
}

pub fn get_user_credentials(
    conn: &Connection,
    email: &str,
) -> anyhow::Result<Option<UserCredentials>> {
    let result = conn.query_row(
        "SELECT id, password_hash, is_active FROM users WHERE email = ?1",
        params![email],
        |row| {
            Ok(UserCredentials {
                id: row.get(0)?,
                password_hash: row.get(1)?,
                is_active: row.get::<_, i32>(2)? != 0,
            })
        },
    );

    match result {
        Ok(creds) => Ok(Some(creds)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn set_user_active(conn: &Connection, user_id: &str, active: bool) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE users SET is_active = ?1, updated_at = datetime('now') WHERE id = ?2",
        params![active as i32, user_id],
    )?;
    Ok(count > 0)
}

pub fn is_admin(conn: &Connection, user_id: &str, brand_id: &str) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM admin_users WHERE user_id = ?1 AND brand_id = ?2",
        params![user_id, brand_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn create_session(
    conn: &Connection,
    token: &str,
    user_id: &str,
    expires_at: &NaiveDateTime,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO sessions (token, user_id, expires_at, ip_address, user_agent)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![token, user_id, fmt_datetime(expires_at), ip_address, user_agent],
    )?;
    Ok(())
}

pub fn delete_expired_sessions(conn: &Connection, now: &NaiveDateTime) -> anyhow::Result<usize> {
    let count = conn.execute(
        "DELETE FROM sessions WHERE expires_at <= ?1",
        params![fmt_datetime(now)],
    )?;
    Ok(count)
}

/// The active user behind an unexpired session token.
pub fn find_session_user(
    conn: &Connection,
    token: &str,
    now: &NaiveDateTime,
) -> anyhow::Result<Option<AdminUser>> {
    let result = conn.query_row(
        "SELECT u.id, u.email, u.is_active
         FROM sessions s INNER JOIN users u ON u.id = s.user_id
         WHERE s.token = ?1 AND s.expires_at > ?2 AND u.is_active = 1",
        params![token, fmt_datetime(now)],
        |row| {
            Ok(AdminUser {
                id: row.get(0)?,
                email: row.get(1)?,
                is_active: row.get::<_, i32>(2)? != 0,
            })
        },
    );

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn delete_session(conn: &Connection, token: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(count > 0)
}

// ── Rate Limits ──

/// Bumps the fixed-window counter for `key` and returns the new count.
pub fn increment_counter(conn: &Connection, key: &str, window_start: i64) -> anyhow::Result<i64> {
    let count: i64 = conn.query_row(
        "INSERT INTO rate_limits (key, window_start, count) VALUES (?1, ?2, 1)
         ON CONFLICT(key, window_start) DO UPDATE SET count = count + 1
         RETURNING count",
        params![key, window_start],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn cleanup_counters(conn: &Connection, before_window: i64) -> anyhow::Result<usize> {
    let count = conn.execute(
        "DELETE FROM rate_limits WHERE window_start < ?1",
        params![before_window],
    )?;
    Ok(count)
}
