use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Accepted clock drift between the webhook timestamp and our clock
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Errors that can occur when interacting with the payment provider
#[derive(Debug, Error)]
pub enum StripeError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Checkout session as returned by session creation
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

/// Inbound webhook envelope
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

/// `data.object` of checkout.session.* events
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    pub mode: Option<String>,
    pub subscription: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// `data.object` of customer.subscription.* events
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionObject {
    pub id: String,
    pub status: String,
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl WebhookEvent {
    pub fn checkout_session(&self) -> Result<CheckoutSessionObject, StripeError> {
        serde_json::from_value(self.data.object.clone())
            .map_err(|e| StripeError::InvalidResponse(format!("Bad session object: {}", e)))
    }

    pub fn subscription(&self) -> Result<SubscriptionObject, StripeError> {
        serde_json::from_value(self.data.object.clone())
            .map_err(|e| StripeError::InvalidResponse(format!("Bad subscription object: {}", e)))
    }
}

/// Parameters for a new checkout session
#[derive(Debug, Clone)]
pub struct CheckoutSessionParams {
    pub mode: CheckoutMode,
    pub product_name: String,
    pub amount_cents: i64,
    pub currency: String,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
    /// Carried back on the completion webhook
    pub metadata: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    Payment,
    Subscription,
}

impl CheckoutMode {
    fn as_str(&self) -> &'static str {
        match self {
            CheckoutMode::Payment => "payment",
            CheckoutMode::Subscription => "subscription",
        }
    }
}

/// Payment provider client
///
/// The provider API speaks form-encoded requests; sessions are created with
/// inline price data so no catalog objects need to exist upstream.
pub struct StripeClient {
    api_base: String,
    secret_key: String,
    client: Client,
}

impl StripeClient {
    pub fn new(api_base: String, secret_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key,
            client,
        }
    }

    pub async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> Result<CheckoutSession, StripeError> {
        let url = format!("{}/v1/checkout/sessions", self.api_base);

        let mut form: Vec<(String, String)> = vec![
            ("mode".into(), params.mode.as_str().into()),
            ("success_url".into(), params.success_url.clone()),
            ("cancel_url".into(), params.cancel_url.clone()),
            ("line_items[0][quantity]".into(), "1".into()),
            (
                "line_items[0][price_data][currency]".into(),
                params.currency.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]".into(),
                params.amount_cents.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".into(),
                params.product_name.clone(),
            ),
        ];

        if params.mode == CheckoutMode::Subscription {
            form.push((
                "line_items[0][price_data][recurring][interval]".into(),
                "month".into(),
            ));
        }

        if let Some(email) = &params.customer_email {
            form.push(("customer_email".into(), email.clone()));
        }

        for (key, value) in &params.metadata {
            form.push((format!("metadata[{}]", key), value.clone()));
            if params.mode == CheckoutMode::Subscription {
                form.push((format!("subscription_data[metadata][{}]", key), value.clone()));
            }
        }

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Checkout session creation failed: {} - {}", status, body);
            return Err(StripeError::ApiError(format!(
                "Session creation failed: {}",
                status
            )));
        }

        let session: CheckoutSession = response
            .json()
            .await
            .map_err(|e| StripeError::InvalidResponse(e.to_string()))?;

        Ok(session)
    }

    /// Flag a subscription to lapse at the end of the current period
    pub async fn cancel_at_period_end(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionObject, StripeError> {
        let url = format!("{}/v1/subscriptions/{}", self.api_base, subscription_id);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[("cancel_at_period_end", "true")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StripeError::ApiError(format!(
                "Subscription update failed: {}",
                response.status()
            )));
        }

        let subscription: SubscriptionObject = response
            .json()
            .await
            .map_err(|e| StripeError::InvalidResponse(e.to_string()))?;

        Ok(subscription)
    }
}

/// Verify a `t=...,v1=...` webhook signature header
///
/// The signed payload is `{timestamp}.{raw body}`, HMAC-SHA256 over the
/// webhook secret. Timestamps outside the tolerance window are refused to
/// blunt replay.
pub fn verify_webhook_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now_unix: i64,
) -> Result<(), StripeError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = value.parse().ok();
            }
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| StripeError::InvalidSignature("missing timestamp".to_string()))?;

    if signatures.is_empty() {
        return Err(StripeError::InvalidSignature("missing v1 signature".to_string()));
    }

    if (now_unix - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(StripeError::InvalidSignature("timestamp outside tolerance".to_string()));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| StripeError::InvalidSignature("bad secret".to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let expected = hex::encode(mac.finalize().into_bytes());

    // Accept any matching v1 entry, as the provider does during key rotation
    if signatures.iter().any(|sig| {
        sig.len() == expected.len()
            && sig
                .bytes()
                .zip(expected.bytes())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }) {
        Ok(())
    } else {
        Err(StripeError::InvalidSignature("signature mismatch".to_string()))
    }
}
