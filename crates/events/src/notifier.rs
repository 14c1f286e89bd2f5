//! Transactional email driven by bus events.
//!
//! [`EmailNotifier`] subscribes to the [`EventBus`](crate::bus::EventBus),
//! renders a plain-text email for the event types customers care about and
//! hands it to the [`Mailer`]. Without SMTP configured the rendered email is
//! logged instead, which keeps verification links usable in development.

use tokio::sync::broadcast;

use crate::bus::{event_types, PlatformEvent};
use crate::mailer::Mailer;

/// An email ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Background service that emails customers about their account, orders
/// and support tickets.
pub struct EmailNotifier {
    mailer: Option<Mailer>,
    public_url: String,
}

impl EmailNotifier {
    /// `public_url` is the storefront origin used to build links.
    pub fn new(mailer: Option<Mailer>, public_url: impl Into<String>) -> Self {
        Self {
            mailer,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Run until the bus closes.
    pub async fn run(self, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.handle(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Email notifier lagged, some emails were not sent");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, email notifier shutting down");
                    break;
                }
            }
        }
    }

    async fn handle(&self, event: &PlatformEvent) {
        let Some(email) = render(event, &self.public_url) else {
            return;
        };

        match &self.mailer {
            Some(mailer) => {
                if let Err(e) = mailer.send(&email.to, &email.subject, email.body).await {
                    tracing::error!(
                        error = %e,
                        event_type = %event.event_type,
                        to = %email.to,
                        "Failed to send email"
                    );
                }
            }
            None => {
                tracing::info!(
                    to = %email.to,
                    subject = %email.subject,
                    body = %email.body,
                    "SMTP not configured, email not sent"
                );
            }
        }
    }
}

fn payload_str<'a>(event: &'a PlatformEvent, key: &str) -> Option<&'a str> {
    event.payload.get(key).and_then(|v| v.as_str())
}

fn payload_i64(event: &PlatformEvent, key: &str) -> Option<i64> {
    event.payload.get(key).and_then(|v| v.as_i64())
}

/// Format integer cents as `"12.99 USD"`.
pub fn format_amount(cents: i64, currency: &str) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02} {}", abs / 100, abs % 100, currency.to_uppercase())
}

/// Render the email for `event`, or `None` when the event type sends no
/// email or the payload has no recipient.
pub fn render(event: &PlatformEvent, public_url: &str) -> Option<RenderedEmail> {
    let to = payload_str(event, "email")?.to_string();
    let greeting = match payload_str(event, "first_name") {
        Some(name) if !name.is_empty() => format!("Hi {name},"),
        _ => "Hello,".to_string(),
    };

    let (subject, body) = match event.event_type.as_str() {
        event_types::USER_REGISTERED | event_types::USER_VERIFICATION_REQUESTED => {
            let token = payload_str(event, "token")?;
            (
                "Verify your email address".to_string(),
                format!(
                    "{greeting}\n\nPlease confirm your email address by opening the link below:\n\n\
                     {public_url}/verify-email?token={token}\n\n\
                     The link expires in 24 hours. If you did not create an account, ignore this email."
                ),
            )
        }
        event_types::USER_PASSWORD_RESET_REQUESTED => {
            let token = payload_str(event, "token")?;
            (
                "Reset your password".to_string(),
                format!(
                    "{greeting}\n\nA password reset was requested for your account. \
                     Open the link below to choose a new password:\n\n\
                     {public_url}/reset-password?token={token}\n\n\
                     The link expires in 1 hour. If you did not request this, ignore this email."
                ),
            )
        }
        event_types::ORDER_CREATED | event_types::ORDER_PAID => {
            let order_id = event.source_entity_id?;
            let amount = format_amount(
                payload_i64(event, "total_cents").unwrap_or(0),
                payload_str(event, "currency").unwrap_or("usd"),
            );
            if event.event_type == event_types::ORDER_PAID {
                (
                    format!("Payment received for order #{order_id}"),
                    format!(
                        "{greeting}\n\nWe received your payment of {amount} for order #{order_id}. \
                         We will let you know when it ships.\n\n{public_url}/orders/{order_id}"
                    ),
                )
            } else {
                (
                    format!("Order #{order_id} received"),
                    format!(
                        "{greeting}\n\nThanks for your order #{order_id} totalling {amount}. \
                         Complete checkout to confirm it.\n\n{public_url}/orders/{order_id}"
                    ),
                )
            }
        }
        event_types::ORDER_STATUS_CHANGED => {
            let order_id = event.source_entity_id?;
            let status = payload_str(event, "to")?;
            (
                format!("Order #{order_id} is now {status}"),
                format!(
                    "{greeting}\n\nThe status of your order #{order_id} changed to {status}.\n\n\
                     {public_url}/orders/{order_id}"
                ),
            )
        }
        event_types::TICKET_REPLIED => {
            let ticket_id = event.source_entity_id?;
            let subject = payload_str(event, "subject").unwrap_or("your request");
            (
                format!("New reply on support ticket #{ticket_id}"),
                format!(
                    "{greeting}\n\nOur support team replied to \"{subject}\".\n\n\
                     {public_url}/support/{ticket_id}"
                ),
            )
        }
        _ => return None,
    };

    Some(RenderedEmail { to, subject, body })
}
