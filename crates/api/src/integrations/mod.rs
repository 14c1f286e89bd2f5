//! Clients for external services.
//!
//! Each integration exposes a trait that handlers depend on, so tests can
//! substitute in-process fakes:
//!
//! - [`payments::PaymentProvider`] -- hosted checkout sessions.
//! - [`llm::ChatModel`] -- advisory chat replies.
//! - [`storage::ObjectStore`] -- uploaded product images.

pub mod llm;
pub mod payments;
pub mod storage;
