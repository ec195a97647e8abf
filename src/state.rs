use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::email::EmailProvider;
use crate::services::messaging::{MessagingProvider, PhoneVerifier};
use crate::services::notifications::{NotificationSettings, Notifier};
use crate::services::payments::PaymentGateway;
use crate::services::rate_limit::{RateLimitPolicy, RateLimiter, SqliteCounterStore};

/// Outbound integrations, built once at startup.
pub struct Providers {
    pub messaging: Arc<dyn MessagingProvider>,
    pub email: Arc<dyn EmailProvider>,
    pub verifier: Arc<dyn PhoneVerifier>,
    pub payments: Arc<dyn PaymentGateway>,
}

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub notifier: Arc<Notifier>,
    pub verifier: Arc<dyn PhoneVerifier>,
    pub payments: Arc<dyn PaymentGateway>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: AppConfig, conn: Connection, providers: Providers) -> Self {
        let db = Arc::new(Mutex::new(conn));
        let notifier = Notifier::new(
            providers.messaging,
            providers.email,
            NotificationSettings::from_config(&config),
        );
        let rate_limiter = RateLimiter::new(
            Arc::new(SqliteCounterStore::new(Arc::clone(&db))),
            RateLimitPolicy {
                limit: config.rate_limit_max,
                window_secs: config.rate_limit_window_secs,
                timeout: Duration::from_millis(config.rate_limit_timeout_ms),
            },
        );

        Self {
            db,
            config,
            notifier: Arc::new(notifier),
            verifier: providers.verifier,
            payments: providers.payments,
            rate_limiter,
        }
    }

    /// Never hold the guard across an `.await`.
    pub fn conn(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Internal("database lock poisoned".to_string()))
    }
}
