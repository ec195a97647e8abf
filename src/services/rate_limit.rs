//! Fixed-window rate limiting that fails closed.
//!
//! Any store error or timeout denies the request. After `FAILURE_THRESHOLD`
//! consecutive failures the breaker opens and every check is denied without
//! touching the store until `CIRCUIT_OPEN_DURATION` has passed since the last
//! failure.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use rusqlite::Connection;
use serde::Serialize;
use tokio::time::Instant;

use crate::db::queries;

pub const FAILURE_THRESHOLD: u32 = 5;
pub const CIRCUIT_OPEN_DURATION: Duration = Duration::from_secs(60);

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increments the counter for `key` in the current window and returns it.
    async fn incr(&self, key: &str, window_secs: i64) -> anyhow::Result<i64>;
}

pub struct SqliteCounterStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteCounterStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CounterStore for SqliteCounterStore {
    /// Runs on the blocking pool so a contended database lock surfaces as a
    /// timeout in `RateLimiter::check` instead of stalling the worker.
    async fn incr(&self, key: &str, window_secs: i64) -> anyhow::Result<i64> {
        let window_secs = window_secs.max(1);
        let now = chrono::Utc::now().timestamp();
        let window_start = now - now.rem_euclid(window_secs);

        let db = Arc::clone(&self.db);
        let key = key.to_string();
        tokio::task::spawn_blocking(move || -> anyhow::Result<i64> {
            let db = db
                .lock()
                .map_err(|_| anyhow::anyhow!("database lock poisoned"))?;
            let count = queries::increment_counter(&db, &key, window_start)?;
            if count == 1 {
                queries::cleanup_counters(&db, window_start - window_secs)?;
            }
            Ok(count)
        })
        .await
        .context("rate limit counter task failed")?
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    pub limit: i64,
    pub window_secs: i64,
    pub timeout: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            limit: 10,
            window_secs: 60,
            timeout: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitResult {
    pub success: bool,
    pub limit: i64,
    pub remaining: i64,
}

impl RateLimitResult {
    fn denied() -> Self {
        Self {
            success: false,
            limit: 0,
            remaining: 0,
        }
    }
}

#[derive(Debug, Default)]
struct Breaker {
    failures: u32,
    last_failure: Option<Instant>,
}

impl Breaker {
    fn is_open(&self, now: Instant) -> bool {
        self.failures >= FAILURE_THRESHOLD
            && self
                .last_failure
                .is_some_and(|at| now.duration_since(at) < CIRCUIT_OPEN_DURATION)
    }
}

pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    policy: RateLimitPolicy,
    breaker: Mutex<Breaker>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, policy: RateLimitPolicy) -> Self {
        Self {
            store,
            policy,
            breaker: Mutex::new(Breaker::default()),
        }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    pub async fn check(&self, key: &str) -> RateLimitResult {
        self.check_with_limit(key, self.policy.limit).await
    }

    pub async fn check_with_limit(&self, key: &str, limit: i64) -> RateLimitResult {
        if self.with_breaker(|b| b.is_open(Instant::now())) {
            tracing::warn!(key, "rate limit circuit open, denying request");
            return RateLimitResult::denied();
        }

        let outcome = tokio::time::timeout(
            self.policy.timeout,
            self.store.incr(key, self.policy.window_secs),
        )
        .await;

        match outcome {
            Ok(Ok(current)) => {
                self.with_breaker(|b| b.failures = 0);
                let success = current <= limit;
                if !success {
                    tracing::warn!(key, current, limit, "rate limit exceeded");
                }
                RateLimitResult {
                    success,
                    limit,
                    remaining: (limit - current).max(0),
                }
            }
            Ok(Err(e)) => {
                self.record_failure();
                tracing::error!(key, error = %e, "rate limit store error, denying request");
                RateLimitResult::denied()
            }
            Err(_) => {
                self.record_failure();
                tracing::error!(key, "rate limit store timed out, denying request");
                RateLimitResult::denied()
            }
        }
    }

    fn record_failure(&self) {
        self.with_breaker(|b| {
            b.failures = b.failures.saturating_add(1);
            b.last_failure = Some(Instant::now());
        });
    }

    fn with_breaker<T>(&self, f: impl FnOnce(&mut Breaker) -> T) -> T {
        let mut breaker = match self.breaker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut breaker)
    }
}
