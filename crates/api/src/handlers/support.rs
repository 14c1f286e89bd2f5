//! Support ticket handlers (`/support/tickets`).
//!
//! Customers see their own tickets; admins see every ticket and their
//! replies count as staff replies.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;
use vitashop_core::error::CoreError;
use vitashop_core::status::TicketStatus;
use vitashop_core::types::DbId;
use vitashop_db::models::support::{
    CreateTicket, CreateTicketMessage, SupportTicket, TicketMessage, TicketQuery,
};
use vitashop_db::repositories::{OrderRepo, SupportTicketRepo, TicketMessageRepo, UserRepo};
use vitashop_events::{event_types, PlatformEvent};

use crate::error::{AppError, AppResult};
use crate::handlers::{found, validate_body};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::query::StatusPageParams;
use crate::response::{DataResponse, PaginatedResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTicketRequest {
    #[validate(length(min = 1, max = 200))]
    pub subject: String,
    #[validate(length(min = 1, max = 5000))]
    pub message: String,
    pub order_id: Option<DbId>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReplyRequest {
    #[validate(length(min = 1, max = 5000))]
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTicketStatusRequest {
    pub status: String,
}

impl CreateTicketRequest {
    fn trimmed(self) -> Self {
        Self {
            subject: self.subject.trim().to_string(),
            message: self.message.trim().to_string(),
            order_id: self.order_id,
        }
    }
}

impl ReplyRequest {
    fn trimmed(self) -> Self {
        Self {
            body: self.body.trim().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TicketView {
    #[serde(flatten)]
    pub ticket: SupportTicket,
    pub status: TicketStatus,
}

#[derive(Debug, Serialize)]
pub struct TicketDetail {
    #[serde(flatten)]
    pub ticket: SupportTicket,
    pub status: TicketStatus,
    pub messages: Vec<TicketMessage>,
}

impl TicketView {
    fn new(ticket: SupportTicket) -> AppResult<Self> {
        let status = TicketStatus::from_id(ticket.status_id)?;
        Ok(Self { ticket, status })
    }
}

impl TicketDetail {
    fn new(ticket: SupportTicket, messages: Vec<TicketMessage>) -> AppResult<Self> {
        let status = TicketStatus::from_id(ticket.status_id)?;
        Ok(Self {
            ticket,
            status,
            messages,
        })
    }
}

/// Status a ticket moves to after a reply.
fn status_after_reply(is_staff: bool) -> TicketStatus {
    if is_staff {
        TicketStatus::Answered
    } else {
        TicketStatus::Open
    }
}

/// Load a ticket the caller may see, 404 otherwise.
async fn load_visible_ticket(
    state: &AppState,
    user: &AuthUser,
    id: DbId,
) -> AppResult<SupportTicket> {
    let ticket = SupportTicketRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|t| user.is_admin() || t.user_id == user.user_id);
    found(ticket, "Ticket", id)
}

/// POST /api/support/tickets
pub async fn create(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<CreateTicketRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<TicketDetail>>)> {
    let input = input.trimmed();
    validate_body(&input)?;
    if let Some(order_id) = input.order_id {
        found(
            OrderRepo::find_for_user(&state.pool, order_id, auth_user.user_id).await?,
            "Order",
            order_id,
        )?;
    }

    let (ticket, message) = SupportTicketRepo::create_with_message(
        &state.pool,
        &CreateTicket {
            user_id: auth_user.user_id,
            order_id: input.order_id,
            subject: input.subject,
            message: input.message,
        },
    )
    .await?;
    tracing::info!(ticket_id = ticket.id, user_id = auth_user.user_id, "Support ticket opened");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: TicketDetail::new(ticket, vec![message])?,
        }),
    ))
}

/// GET /api/support/tickets?status=&page=&limit=
pub async fn list(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<StatusPageParams>,
) -> AppResult<Json<PaginatedResponse<TicketView>>> {
    let page = params.page();
    let status_id = params
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(TicketStatus::from_name)
        .transpose()?
        .map(TicketStatus::id);

    let query = TicketQuery {
        user_id: (!auth_user.is_admin()).then_some(auth_user.user_id),
        status_id,
        limit: page.limit,
        offset: page.offset(),
    };
    let tickets = SupportTicketRepo::list(&state.pool, &query).await?;
    let total = SupportTicketRepo::count(&state.pool, &query).await?;

    Ok(Json(PaginatedResponse {
        data: tickets
            .into_iter()
            .map(TicketView::new)
            .collect::<AppResult<_>>()?,
        meta: page.meta(total),
    }))
}

/// GET /api/support/tickets/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<TicketDetail>>> {
    let ticket = load_visible_ticket(&state, &auth_user, id).await?;
    let messages = TicketMessageRepo::list_for_ticket(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: TicketDetail::new(ticket, messages)?,
    }))
}

/// POST /api/support/tickets/{id}/messages
pub async fn reply(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<ReplyRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<TicketMessage>>)> {
    let input = input.trimmed();
    validate_body(&input)?;
    let ticket = load_visible_ticket(&state, &auth_user, id).await?;
    let is_staff = auth_user.is_admin() && ticket.user_id != auth_user.user_id;

    let (ticket, message) = SupportTicketRepo::reply(
        &state.pool,
        &CreateTicketMessage {
            ticket_id: id,
            author_id: auth_user.user_id,
            is_staff,
            body: input.body,
        },
        status_after_reply(is_staff),
    )
    .await?
    .ok_or_else(|| AppError::Core(CoreError::Conflict("Ticket is closed".into())))?;

    if is_staff {
        if let Some(owner) = UserRepo::find_by_id(&state.pool, ticket.user_id).await? {
            state.event_bus.publish(
                PlatformEvent::new(event_types::TICKET_REPLIED)
                    .with_source("ticket", ticket.id)
                    .with_actor(auth_user.user_id)
                    .with_payload(json!({
                        "email": owner.email,
                        "first_name": owner.first_name,
                        "subject": ticket.subject,
                    })),
            );
        }
    }
    tracing::info!(ticket_id = id, user_id = auth_user.user_id, is_staff, "Ticket reply added");

    Ok((StatusCode::CREATED, Json(DataResponse { data: message })))
}

/// POST /api/support/tickets/{id}/close
pub async fn close(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<TicketView>>> {
    load_visible_ticket(&state, &auth_user, id).await?;
    let ticket = found(
        SupportTicketRepo::update_status(&state.pool, id, TicketStatus::Closed).await?,
        "Ticket",
        id,
    )?;
    tracing::info!(ticket_id = id, user_id = auth_user.user_id, "Ticket closed");
    Ok(Json(DataResponse {
        data: TicketView::new(ticket)?,
    }))
}

/// PATCH /api/support/tickets/{id}/status
pub async fn update_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateTicketStatusRequest>,
) -> AppResult<Json<DataResponse<TicketView>>> {
    let status = TicketStatus::from_name(&input.status)?;
    let ticket = found(
        SupportTicketRepo::update_status(&state.pool, id, status).await?,
        "Ticket",
        id,
    )?;
    tracing::info!(ticket_id = id, user_id = admin.user_id, %status, "Ticket status updated");
    Ok(Json(DataResponse {
        data: TicketView::new(ticket)?,
    }))
}
