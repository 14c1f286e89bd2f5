//! Support ticket and ticket message models.

use serde::Serialize;
use sqlx::FromRow;
use vitashop_core::status::StatusId;
use vitashop_core::types::{DbId, Timestamp};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SupportTicket {
    pub id: DbId,
    pub user_id: DbId,
    pub order_id: Option<DbId>,
    pub subject: String,
    pub status_id: StatusId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TicketMessage {
    pub id: DbId,
    pub ticket_id: DbId,
    pub author_id: DbId,
    pub is_staff: bool,
    pub body: String,
    pub created_at: Timestamp,
}

/// Input for opening a ticket together with its first message.
#[derive(Debug, Clone)]
pub struct CreateTicket {
    pub user_id: DbId,
    pub order_id: Option<DbId>,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct CreateTicketMessage {
    pub ticket_id: DbId,
    pub author_id: DbId,
    pub is_staff: bool,
    pub body: String,
}

#[derive(Debug, Clone, Default)]
pub struct TicketQuery {
    pub user_id: Option<DbId>,
    pub status_id: Option<StatusId>,
    pub limit: i64,
    pub offset: i64,
}
