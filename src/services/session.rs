//! Short-lived client sessions binding a verified phone number.
//!
//! Token format: `base64url(json) "." base64url(hmac_sha256(secret, json))`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

pub const COOKIE_NAME: &str = "client_session";
pub const SESSION_TTL_SECS: i64 = 30 * 60;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSession {
    pub phone: String,
    /// Unix seconds.
    pub expires: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Not authenticated")]
    Missing,
    #[error("Invalid session")]
    Invalid,
    #[error("Session expired")]
    Expired,
}

fn sign(secret: &[u8], payload: &str) -> anyhow::Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| anyhow::anyhow!("invalid session secret: {e}"))?;
    mac.update(payload.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

pub fn issue(secret: &[u8], phone: &str, now: i64) -> anyhow::Result<String> {
    let session = ClientSession {
        phone: phone.to_string(),
        expires: now + SESSION_TTL_SECS,
    };
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&session)?);
    let signature = URL_SAFE_NO_PAD.encode(sign(secret, &payload)?);
    Ok(format!("{payload}.{signature}"))
}

pub fn verify(secret: &[u8], token: Option<&str>, now: i64) -> Result<ClientSession, SessionError> {
    let token = token.filter(|t| !t.is_empty()).ok_or(SessionError::Missing)?;
    let (payload, signature) = token.split_once('.').ok_or(SessionError::Invalid)?;

    let signature = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| SessionError::Invalid)?;
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| SessionError::Invalid)?;
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| SessionError::Invalid)?;

    let json = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| SessionError::Invalid)?;
    let session: ClientSession =
        serde_json::from_slice(&json).map_err(|_| SessionError::Invalid)?;

    if session.expires < now {
        return Err(SessionError::Expired);
    }
    Ok(session)
}
