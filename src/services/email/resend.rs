use anyhow::Context;
use async_trait::async_trait;

use super::{EmailMessage, EmailProvider};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

pub struct ResendEmailProvider {
    api_key: String,
    api_url: String,
    client: reqwest::Client,
}

impl ResendEmailProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            api_url: RESEND_API_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl EmailProvider for ResendEmailProvider {
    async fn send_email(&self, message: &EmailMessage) -> anyhow::Result<()> {
        anyhow::ensure!(!self.api_key.is_empty(), "Resend API key not configured");

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(message)
            .send()
            .await
            .context("network error while sending email")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("email send failed with status {status}: {error_text}");
        }

        tracing::info!(subject = %message.subject, "email sent");
        Ok(())
    }
}
