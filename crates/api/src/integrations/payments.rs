//! Hosted checkout through the payment processor.
//!
//! [`PaymentProvider`] is the seam handlers talk to; [`StripeProvider`] is the
//! production implementation posting form-encoded requests to the Checkout
//! Sessions API. Webhook deliveries are parsed into [`WebhookEvent`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;
use vitashop_core::types::{Cents, DbId};

use crate::config::{env_opt, env_or};

const DEFAULT_API_URL: &str = "https://api.stripe.com/v1";
const DEFAULT_SUCCESS_URL: &str =
    "http://localhost:5173/checkout/success?session_id={CHECKOUT_SESSION_ID}";
const DEFAULT_CANCEL_URL: &str = "http://localhost:5173/checkout/cancel";

/// Payment processor settings.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// API secret key. Checkout returns 503 while unset.
    pub secret_key: Option<String>,
    /// Webhook signing secret. Webhooks are rejected while unset.
    pub webhook_secret: Option<String>,
    pub api_url: String,
    /// Lowercase ISO currency code for new orders.
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    /// Per-request timeout for processor API calls.
    pub timeout_secs: u64,
}

impl PaymentConfig {
    /// Load payment settings from the environment.
    ///
    /// | Env Var                 | Default                         |
    /// |-------------------------|---------------------------------|
    /// | `STRIPE_SECRET_KEY`     | unset                           |
    /// | `STRIPE_WEBHOOK_SECRET` | unset                           |
    /// | `STRIPE_API_URL`        | `https://api.stripe.com/v1`     |
    /// | `PAYMENT_CURRENCY`      | `usd`                           |
    /// | `CHECKOUT_SUCCESS_URL`  | local storefront success page   |
    /// | `CHECKOUT_CANCEL_URL`   | local storefront cancel page    |
    /// | `STRIPE_TIMEOUT_SECS`   | `30`                            |
    pub fn from_env() -> Self {
        Self {
            secret_key: env_opt("STRIPE_SECRET_KEY"),
            webhook_secret: env_opt("STRIPE_WEBHOOK_SECRET"),
            api_url: env_or("STRIPE_API_URL", DEFAULT_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            currency: env_or("PAYMENT_CURRENCY", "usd".to_string()).to_lowercase(),
            success_url: env_or("CHECKOUT_SUCCESS_URL", DEFAULT_SUCCESS_URL.to_string()),
            cancel_url: env_or("CHECKOUT_CANCEL_URL", DEFAULT_CANCEL_URL.to_string()),
            timeout_secs: env_or("STRIPE_TIMEOUT_SECS", 30),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment provider is not configured")]
    NotConfigured,

    /// Network, DNS or TLS failure.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The processor answered with a non-2xx status.
    #[error("Payment API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected payment API response: {0}")]
    InvalidResponse(String),
}

/// One purchasable line on the hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLine {
    pub name: String,
    pub unit_amount_cents: Cents,
    pub quantity: i32,
}

/// Everything needed to open a checkout session for an order.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub order_id: DbId,
    pub currency: String,
    pub customer_email: Option<String>,
    pub lines: Vec<CheckoutLine>,
    pub success_url: String,
    pub cancel_url: String,
}

/// A created checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Open a hosted checkout session for `request`.
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;
}

/// Form-encoded Checkout Sessions client.
#[derive(Clone)]
pub struct StripeProvider {
    inner: Arc<StripeProviderInner>,
}

struct StripeProviderInner {
    client: reqwest::Client,
    api_url: String,
    secret_key: Option<String>,
}

impl StripeProvider {
    pub fn new(config: &PaymentConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            inner: Arc::new(StripeProviderInner {
                client,
                api_url: config.api_url.clone(),
                secret_key: config.secret_key.clone(),
            }),
        })
    }
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    #[instrument(skip(self, request), fields(order_id = request.order_id))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let secret = self
            .inner
            .secret_key
            .as_deref()
            .ok_or(PaymentError::NotConfigured)?;

        let response = self
            .inner
            .client
            .post(format!("{}/checkout/sessions", self.inner.api_url))
            .bearer_auth(secret)
            .form(&checkout_form(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let session: CheckoutSession = response
            .json()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))?;
        tracing::info!(session_id = %session.id, "Checkout session created");
        Ok(session)
    }
}

/// Encode a checkout request as the processor's bracketed form fields.
pub fn checkout_form(request: &CheckoutRequest) -> Vec<(String, String)> {
    let order_id = request.order_id.to_string();
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        ("client_reference_id".to_string(), order_id.clone()),
        ("metadata[order_id]".to_string(), order_id),
    ];
    if let Some(email) = &request.customer_email {
        form.push(("customer_email".to_string(), email.clone()));
    }
    for (i, line) in request.lines.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((
            format!("{prefix}[price_data][currency]"),
            request.currency.clone(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            line.name.clone(),
        ));
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            line.unit_amount_cents.to_string(),
        ));
        form.push((format!("{prefix}[quantity]"), line.quantity.to_string()));
    }
    form
}

// ---------------------------------------------------------------------------
// Webhook payloads
// ---------------------------------------------------------------------------

/// A webhook delivery envelope.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEventData {
    pub object: CheckoutSessionObject,
}

/// The checkout session carried by `checkout.session.*` events.
#[derive(Debug, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSessionObject {
    /// Order id from metadata, falling back to `client_reference_id`.
    pub fn order_id(&self) -> Option<DbId> {
        self.metadata
            .get("order_id")
            .or(self.client_reference_id.as_ref())
            .and_then(|v| v.parse().ok())
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }
}
