pub mod resend;

use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,
    pub subject: String,
    pub html: String,
}

impl EmailMessage {
    pub fn new(from: &str, to: &str, subject: String, html: String) -> Self {
        Self {
            from: from.to_string(),
            to: vec![to.to_string()],
            cc: vec![],
            subject,
            html,
        }
    }

    /// Adds non-empty addresses to the cc list.
    pub fn with_cc<'a>(mut self, cc: impl IntoIterator<Item = &'a str>) -> Self {
        self.cc
            .extend(cc.into_iter().filter(|a| !a.is_empty()).map(str::to_string));
        self
    }
}

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_email(&self, message: &EmailMessage) -> anyhow::Result<()>;
}
