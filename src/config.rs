use std::env;

use rand::RngCore;

pub const DEFAULT_BRAND_ID: &str = "074ccc70-e8b5-4284-907b-82571f4a2e45";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub brand_id: String,
    pub business_name: String,
    pub business_phone: String,
    pub public_base_url: String,
    pub promo_enabled: bool,
    pub promo_discount_percent: u32,
    pub owner_phone: String,
    pub owner_email: String,
    pub monitor_email: String,
    pub email_from: String,
    pub resend_api_key: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_phone_number: String,
    pub twilio_verify_service_sid: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub session_secret: Vec<u8>,
    pub rate_limit_max: i64,
    pub rate_limit_window_secs: i64,
    pub rate_limit_timeout_ms: u64,
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let session_secret = match env::var("SESSION_SECRET") {
            Ok(s) if !s.is_empty() => s.into_bytes(),
            _ => {
                tracing::warn!("SESSION_SECRET not set; client sessions will not survive a restart");
                random_secret()
            }
        };

        Self {
            port: parse_or("PORT", 3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "detailbook.db".to_string()),
            brand_id: env::var("BRAND_ID").unwrap_or_else(|_| DEFAULT_BRAND_ID.to_string()),
            business_name: env::var("BUSINESS_NAME")
                .unwrap_or_else(|_| "Mr. Guy Mobile Detail".to_string()),
            business_phone: env::var("BUSINESS_PHONE").unwrap_or_else(|_| "9548044747".to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            promo_enabled: parse_flag("PROMO_ENABLED", true),
            promo_discount_percent: parse_or("PROMO_DISCOUNT_PERCENT", 25).min(100),
            owner_phone: env::var("OWNER_PHONE").unwrap_or_default(),
            owner_email: env::var("OWNER_EMAIL").unwrap_or_default(),
            monitor_email: env::var("MONITOR_EMAIL").unwrap_or_default(),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "Mr. Guy Detail <bookings@mrguydetail.com>".to_string()),
            resend_api_key: env::var("RESEND_API_KEY").unwrap_or_default(),
            twilio_account_sid: env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            twilio_phone_number: env::var("TWILIO_PHONE_NUMBER").unwrap_or_default(),
            twilio_verify_service_sid: env::var("TWILIO_VERIFY_SERVICE_SID").unwrap_or_default(),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            session_secret,
            rate_limit_max: parse_or("RATE_LIMIT_MAX", 10),
            rate_limit_window_secs: parse_or("RATE_LIMIT_WINDOW_SECS", 60),
            rate_limit_timeout_ms: parse_or("RATE_LIMIT_TIMEOUT_MS", 500),
        }
    }

    /// Defaults with no environment lookups and no external credentials.
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            database_url: ":memory:".to_string(),
            brand_id: DEFAULT_BRAND_ID.to_string(),
            business_name: "Mr. Guy Mobile Detail".to_string(),
            business_phone: "9548044747".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            promo_enabled: true,
            promo_discount_percent: 25,
            owner_phone: "9548044747".to_string(),
            owner_email: "owner@example.com".to_string(),
            monitor_email: String::new(),
            email_from: "bookings@example.com".to_string(),
            resend_api_key: String::new(),
            twilio_account_sid: String::new(),
            twilio_auth_token: String::new(),
            twilio_phone_number: String::new(),
            twilio_verify_service_sid: String::new(),
            stripe_secret_key: String::new(),
            stripe_webhook_secret: "whsec_test".to_string(),
            session_secret: b"test-session-secret".to_vec(),
            rate_limit_max: 10,
            rate_limit_window_secs: 60,
            rate_limit_timeout_ms: 500,
        }
    }
}

fn random_secret() -> Vec<u8> {
    let mut secret = vec![0u8; 32];
    rand::thread_rng().fill_bytes(&mut secret);
    secret
}
