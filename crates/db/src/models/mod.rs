//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row
//! - Create/update DTOs for inserts and patches
//! - Query filters where a listing needs one

pub mod address;
pub mod ai_conversation;
pub mod cart;
pub mod category;
pub mod order;
pub mod product;
pub mod role;
pub mod session;
pub mod support;
pub mod user;
pub mod user_token;
