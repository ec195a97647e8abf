use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use super::{CheckoutRequest, CheckoutSession, PaymentGateway};

const CHECKOUT_SESSIONS_URL: &str = "https://api.stripe.com/v1/checkout/sessions";

pub struct StripeGateway {
    secret_key: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

impl StripeGateway {
    pub fn new(secret_key: String) -> Self {
        Self {
            secret_key,
            client: reqwest::Client::new(),
        }
    }
}

/// Stripe's bracketed form encoding for a checkout session.
pub fn form_fields(request: &CheckoutRequest) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = vec![
        ("mode".into(), "payment".into()),
        ("payment_method_types[0]".into(), "card".into()),
        ("line_items[0][quantity]".into(), "1".into()),
        ("line_items[0][price_data][currency]".into(), "usd".into()),
        (
            "line_items[0][price_data][unit_amount]".into(),
            request.unit_amount_cents.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]".into(),
            request.product_name.clone(),
        ),
        (
            "line_items[0][price_data][product_data][description]".into(),
            request.description.clone(),
        ),
        (
            "line_items[0][price_data][product_data][metadata][package_id]".into(),
            request.package_id.clone(),
        ),
        ("success_url".into(), request.success_url.clone()),
        ("cancel_url".into(), request.cancel_url.clone()),
    ];
    if let Some(email) = &request.customer_email {
        fields.push(("customer_email".into(), email.clone()));
    }
    for (key, value) in &request.metadata {
        fields.push((format!("metadata[{key}]"), value.clone()));
    }
    fields
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> anyhow::Result<CheckoutSession> {
        anyhow::ensure!(!self.secret_key.is_empty(), "STRIPE_SECRET_KEY not configured");

        let session: SessionResponse = self
            .client
            .post(CHECKOUT_SESSIONS_URL)
            .bearer_auth(&self.secret_key)
            .form(&form_fields(request))
            .send()
            .await
            .context("failed to reach Stripe")?
            .error_for_status()
            .context("Stripe API returned error")?
            .json()
            .await
            .context("failed to parse Stripe checkout session")?;

        Ok(CheckoutSession {
            id: session.id,
            url: session.url,
        })
    }
}
