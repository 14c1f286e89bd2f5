//! Domain rules for the Vitashop storefront.
//!
//! Nothing in this crate performs I/O. The database, HTTP and mail layers
//! depend on it for shared types, validation and the pricing, ordering and
//! advisory logic.

pub mod advisory;
pub mod catalog;
pub mod error;
pub mod hashing;
pub mod orders;
pub mod pagination;
pub mod payments;
pub mod roles;
pub mod status;
pub mod types;
pub mod uploads;
