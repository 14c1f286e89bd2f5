//! Vitashop event bus and transactional email.
//!
//! - [`EventBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`] — the domain event envelope.
//! - [`Mailer`] — SMTP delivery via `lettre`.
//! - [`EmailNotifier`] — background service turning events into emails.

pub mod bus;
pub mod mailer;
pub mod notifier;

pub use bus::{event_types, EventBus, PlatformEvent};
pub use mailer::{EmailConfig, EmailError, Mailer};
pub use notifier::{EmailNotifier, RenderedEmail};
