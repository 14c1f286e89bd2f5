//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod address_repo;
pub mod ai_conversation_repo;
pub mod cart_repo;
pub mod category_repo;
pub mod order_repo;
pub mod product_repo;
pub mod role_repo;
pub mod session_repo;
pub mod support_repo;
pub mod user_repo;
pub mod user_token_repo;

pub use address_repo::AddressRepo;
pub use ai_conversation_repo::AiConversationRepo;
pub use cart_repo::CartRepo;
pub use category_repo::CategoryRepo;
pub use order_repo::{OrderCreateError, OrderRepo};
pub use product_repo::{ProductRepo, StockReservation};
pub use role_repo::RoleRepo;
pub use session_repo::SessionRepo;
pub use support_repo::{SupportTicketRepo, TicketMessageRepo};
pub use user_repo::UserRepo;
pub use user_token_repo::UserTokenRepo;
