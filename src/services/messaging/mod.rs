pub mod twilio;
pub mod verify;

use async_trait::async_trait;

#[async_trait]
pub trait MessagingProvider: Send + Sync {
    /// `to` may be in any format; providers dial it as `+1XXXXXXXXXX`.
    async fn send_message(&self, to: &str, body: &str) -> anyhow::Result<()>;
}

/// One-time-code phone verification.
#[async_trait]
pub trait PhoneVerifier: Send + Sync {
    async fn send_code(&self, phone: &str) -> anyhow::Result<()>;

    /// `Ok(false)` for a wrong or expired code; `Err` only when the provider
    /// could not be reached.
    async fn check_code(&self, phone: &str, code: &str) -> anyhow::Result<bool>;
}
