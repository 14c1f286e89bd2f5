//! Repository for the `support_tickets` and `ticket_messages` tables.

use sqlx::PgPool;
use vitashop_core::status::TicketStatus;
use vitashop_core::types::DbId;

use crate::models::support::{
    CreateTicket, CreateTicketMessage, SupportTicket, TicketMessage, TicketQuery,
};

const COLUMNS: &str = "id, user_id, order_id, subject, status_id, created_at, updated_at";

const MESSAGE_COLUMNS: &str = "id, ticket_id, author_id, is_staff, body, created_at";

// ---------------------------------------------------------------------------
// SupportTicketRepo
// ---------------------------------------------------------------------------

/// Provides ticket lifecycle operations.
pub struct SupportTicketRepo;

impl SupportTicketRepo {
    /// Open a ticket and store its first message in one transaction.
    pub async fn create_with_message(
        pool: &PgPool,
        input: &CreateTicket,
    ) -> Result<(SupportTicket, TicketMessage), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO support_tickets (user_id, order_id, subject, status_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        let ticket = sqlx::query_as::<_, SupportTicket>(&query)
            .bind(input.user_id)
            .bind(input.order_id)
            .bind(&input.subject)
            .bind(TicketStatus::Open.id())
            .fetch_one(&mut *tx)
            .await?;

        let msg_query = format!(
            "INSERT INTO ticket_messages (ticket_id, author_id, is_staff, body)
             VALUES ($1, $2, false, $3)
             RETURNING {MESSAGE_COLUMNS}"
        );
        let message = sqlx::query_as::<_, TicketMessage>(&msg_query)
            .bind(ticket.id)
            .bind(input.user_id)
            .bind(&input.message)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((ticket, message))
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<SupportTicket>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM support_tickets WHERE id = $1");
        sqlx::query_as::<_, SupportTicket>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List tickets, most recently updated first, optionally filtered by
    /// owner and status.
    pub async fn list(
        pool: &PgPool,
        params: &TicketQuery,
    ) -> Result<Vec<SupportTicket>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM support_tickets
             WHERE ($1::BIGINT IS NULL OR user_id = $1)
               AND ($2::SMALLINT IS NULL OR status_id = $2)
             ORDER BY updated_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, SupportTicket>(&query)
            .bind(params.user_id)
            .bind(params.status_id)
            .bind(params.limit)
            .bind(params.offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool, params: &TicketQuery) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM support_tickets
             WHERE ($1::BIGINT IS NULL OR user_id = $1)
               AND ($2::SMALLINT IS NULL OR status_id = $2)",
        )
        .bind(params.user_id)
        .bind(params.status_id)
        .fetch_one(pool)
        .await
    }

    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        status: TicketStatus,
    ) -> Result<Option<SupportTicket>, sqlx::Error> {
        let query = format!(
            "UPDATE support_tickets SET status_id = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SupportTicket>(&query)
            .bind(id)
            .bind(status.id())
            .fetch_optional(pool)
            .await
    }

    /// Add a message and move the ticket to `new_status` atomically.
    ///
    /// Returns `None` when the ticket is closed (or missing); nothing is
    /// written in that case.
    pub async fn reply(
        pool: &PgPool,
        input: &CreateTicketMessage,
        new_status: TicketStatus,
    ) -> Result<Option<(SupportTicket, TicketMessage)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE support_tickets SET status_id = $2
             WHERE id = $1 AND status_id <> $3
             RETURNING {COLUMNS}"
        );
        let ticket = sqlx::query_as::<_, SupportTicket>(&query)
            .bind(input.ticket_id)
            .bind(new_status.id())
            .bind(TicketStatus::Closed.id())
            .fetch_optional(&mut *tx)
            .await?;

        let Some(ticket) = ticket else {
            return Ok(None);
        };

        let message = TicketMessageRepo::create(&mut *tx, input).await?;

        tx.commit().await?;
        Ok(Some((ticket, message)))
    }
}

// ---------------------------------------------------------------------------
// TicketMessageRepo
// ---------------------------------------------------------------------------

/// Provides insert and listing for ticket messages.
pub struct TicketMessageRepo;

impl TicketMessageRepo {
    pub async fn create<'e, E>(
        executor: E,
        input: &CreateTicketMessage,
    ) -> Result<TicketMessage, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let query = format!(
            "INSERT INTO ticket_messages (ticket_id, author_id, is_staff, body)
             VALUES ($1, $2, $3, $4)
             RETURNING {MESSAGE_COLUMNS}"
        );
        sqlx::query_as::<_, TicketMessage>(&query)
            .bind(input.ticket_id)
            .bind(input.author_id)
            .bind(input.is_staff)
            .bind(&input.body)
            .fetch_one(executor)
            .await
    }

    /// Messages of a ticket in posting order.
    pub async fn list_for_ticket(
        pool: &PgPool,
        ticket_id: DbId,
    ) -> Result<Vec<TicketMessage>, sqlx::Error> {
        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM ticket_messages
             WHERE ticket_id = $1
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, TicketMessage>(&query)
            .bind(ticket_id)
            .fetch_all(pool)
            .await
    }
}
