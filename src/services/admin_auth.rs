use chrono::{Duration, NaiveDateTime};
use rand::RngCore;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{AdminSession, AdminUser};

pub const COOKIE_NAME: &str = "admin_session";
pub const SESSION_TTL_HOURS: i64 = 24;

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 32 random bytes as 64 lowercase hex characters.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn create_admin_user(
    conn: &Connection,
    brand_id: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<String> {
    create_admin_user_with_cost(conn, brand_id, email, password, bcrypt::DEFAULT_COST)
}

pub fn create_admin_user_with_cost(
    conn: &Connection,
    brand_id: &str,
    email: &str,
    password: &str,
    cost: u32,
) -> anyhow::Result<String> {
    anyhow::ensure!(password.len() >= 8, "password must be at least 8 characters");
    let hash = bcrypt::hash(password, cost)?;
    let user_id = queries::create_user(conn, &normalize_email(email), &hash)?;
    queries::add_admin(conn, &user_id, brand_id)?;
    Ok(user_id)
}

/// Checks credentials and opens a session. `None` for any rejection, so
/// callers cannot tell a wrong password from an unknown account.
pub fn login(
    conn: &Connection,
    brand_id: &str,
    email: &str,
    password: &str,
    now: NaiveDateTime,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
) -> anyhow::Result<Option<AdminSession>> {
    let Some(creds) = queries::get_user_credentials(conn, &normalize_email(email))? else {
        return Ok(None);
    };

    if !bcrypt::verify(password, &creds.password_hash).unwrap_or(false) {
        tracing::warn!(user_id = %creds.id, "admin login with wrong password");
        return Ok(None);
    }
    if !creds.is_active || !queries::is_admin(conn, &creds.id, brand_id)? {
        tracing::warn!(user_id = %creds.id, "admin login for inactive or non-admin user");
        return Ok(None);
    }

    let session = AdminSession {
        token: generate_token(),
        user_id: creds.id,
        expires_at: now + Duration::hours(SESSION_TTL_HOURS),
    };
    queries::create_session(
        conn,
        &session.token,
        &session.user_id,
        &session.expires_at,
        ip_address,
        user_agent,
    )?;
    tracing::info!(user_id = %session.user_id, "admin logged in");
    Ok(Some(session))
}

/// Resolves a session token to an active admin of `brand_id`, purging
/// expired sessions on the way.
pub fn verify_session(
    conn: &Connection,
    brand_id: &str,
    token: &str,
    now: NaiveDateTime,
) -> anyhow::Result<Option<AdminUser>> {
    if token.is_empty() {
        return Ok(None);
    }
    queries::delete_expired_sessions(conn, &now)?;

    match queries::find_session_user(conn, token, &now)? {
        Some(user) if queries::is_admin(conn, &user.id, brand_id)? => Ok(Some(user)),
        _ => Ok(None),
    }
}

pub fn logout(conn: &Connection, token: &str) -> anyhow::Result<bool> {
    queries::delete_session(conn, token)
}
