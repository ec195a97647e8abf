use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use super::PhoneVerifier;
use crate::services::phone;

/// Twilio Verify service client.
pub struct TwilioVerifyProvider {
    account_sid: String,
    auth_token: String,
    service_sid: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct VerificationCheck {
    status: String,
}

impl TwilioVerifyProvider {
    pub fn new(account_sid: String, auth_token: String, service_sid: String) -> Self {
        Self {
            account_sid,
            auth_token,
            service_sid,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!(
            "https://verify.twilio.com/v2/Services/{}/{endpoint}",
            self.service_sid
        )
    }
}

#[async_trait]
impl PhoneVerifier for TwilioVerifyProvider {
    async fn send_code(&self, phone: &str) -> anyhow::Result<()> {
        anyhow::ensure!(!self.service_sid.is_empty(), "Twilio Verify service not configured");
        let to = phone::to_e164(phone);

        self.client
            .post(self.url("Verifications"))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to.as_str()), ("Channel", "sms")])
            .send()
            .await
            .context("failed to request verification code")?
            .error_for_status()
            .context("Twilio Verify returned error")?;

        Ok(())
    }

    async fn check_code(&self, phone: &str, code: &str) -> anyhow::Result<bool> {
        anyhow::ensure!(!self.service_sid.is_empty(), "Twilio Verify service not configured");
        let to = phone::to_e164(phone);

        let response = self
            .client
            .post(self.url("VerificationCheck"))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to.as_str()), ("Code", code)])
            .send()
            .await
            .context("failed to check verification code")?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "verification check rejected");
            return Ok(false);
        }

        let check: VerificationCheck = response
            .json()
            .await
            .context("failed to parse verification check")?;
        Ok(check.status == "approved")
    }
}
