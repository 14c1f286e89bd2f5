//! Checkout and payment webhook handlers.
//!
//! Checkout opens a hosted session for a pending order. The processor then
//! reports the outcome through the signed webhook, which is the only path
//! that marks an order paid.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use serde_json::json;
use vitashop_core::error::CoreError;
use vitashop_core::payments::{
    events, verify_webhook_signature, DEFAULT_TOLERANCE_SECS, SIGNATURE_HEADER,
};
use vitashop_core::status::OrderStatus;
use vitashop_core::types::DbId;
use vitashop_db::models::order::Order;
use vitashop_db::repositories::{OrderRepo, UserRepo};
use vitashop_events::event_types;

use crate::error::{AppError, AppResult};
use crate::handlers::found;
use crate::handlers::orders::publish_order_event;
use crate::integrations::payments::{
    CheckoutLine, CheckoutRequest, CheckoutSessionObject, WebhookEvent,
};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// POST /api/payments/checkout/{order_id}
pub async fn checkout(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(order_id): Path<DbId>,
) -> AppResult<Json<CheckoutResponse>> {
    let order = found(
        OrderRepo::find_for_user(&state.pool, order_id, auth_user.user_id).await?,
        "Order",
        order_id,
    )?;
    let status = OrderStatus::from_id(order.status_id)?;
    if status != OrderStatus::Pending {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Only pending orders can be paid; order is '{status}'"
        ))));
    }

    let lines = OrderRepo::items_for_order(&state.pool, order.id)
        .await?
        .into_iter()
        .map(|item| CheckoutLine {
            name: item.product_name,
            unit_amount_cents: item.unit_price_cents,
            quantity: item.quantity,
        })
        .collect();
    let customer_email = UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .map(|u| u.email);

    let payment = &state.config.payment;
    let session = state
        .payments
        .create_checkout_session(&CheckoutRequest {
            order_id: order.id,
            currency: order.currency.clone(),
            customer_email,
            lines,
            success_url: payment.success_url.clone(),
            cancel_url: payment.cancel_url.clone(),
        })
        .await?;

    if !OrderRepo::set_checkout_session(&state.pool, order.id, &session.id).await? {
        return Err(AppError::Core(CoreError::Conflict(
            "Order is no longer pending".into(),
        )));
    }
    tracing::info!(order_id = order.id, session_id = %session.id, "Checkout started");

    Ok(Json(CheckoutResponse {
        session_id: session.id,
        url: session.url,
    }))
}

/// POST /api/payments/webhook
///
/// Every well-formed, correctly signed delivery is acknowledged, including
/// duplicates and events for unknown sessions, so the processor stops
/// retrying.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<WebhookAck>> {
    let secret = state
        .config
        .payment
        .webhook_secret
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Webhook signing secret is not configured".into()))?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing webhook signature".into()))?;

    verify_webhook_signature(
        &body,
        signature,
        secret,
        chrono::Utc::now().timestamp(),
        DEFAULT_TOLERANCE_SECS,
    )
    .map_err(|e| {
        tracing::warn!(error = %e, "Rejected webhook delivery");
        AppError::BadRequest(format!("Invalid webhook signature: {e}"))
    })?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Malformed webhook payload: {e}")))?;
    tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Webhook received");

    let session = &event.data.object;
    match event.event_type.as_str() {
        events::CHECKOUT_COMPLETED if session.is_paid() => handle_paid(&state, session).await?,
        events::CHECKOUT_COMPLETED => {
            tracing::info!(session_id = %session.id, "Checkout completed, payment still processing");
        }
        events::CHECKOUT_ASYNC_SUCCEEDED => handle_paid(&state, session).await?,
        events::CHECKOUT_EXPIRED => handle_expired(&state, session).await?,
        events::CHECKOUT_ASYNC_FAILED => {
            tracing::warn!(session_id = %session.id, "Asynchronous payment failed");
        }
        other => tracing::debug!(event_type = other, "Ignoring webhook event"),
    }

    Ok(Json(WebhookAck { received: true }))
}

/// Locate the order a session belongs to: by stored session id first, then
/// by the order id the session was created with.
async fn order_for_session(
    state: &AppState,
    session: &CheckoutSessionObject,
) -> AppResult<Option<Order>> {
    if let Some(order) = OrderRepo::find_by_checkout_session(&state.pool, &session.id).await? {
        return Ok(Some(order));
    }
    match session.order_id() {
        Some(id) => Ok(OrderRepo::find_by_id(&state.pool, id).await?),
        None => Ok(None),
    }
}

async fn handle_paid(state: &AppState, session: &CheckoutSessionObject) -> AppResult<()> {
    let Some(order) = order_for_session(state, session).await? else {
        tracing::warn!(session_id = %session.id, "Payment for unknown checkout session");
        return Ok(());
    };

    match OrderRepo::mark_paid(&state.pool, order.id).await? {
        Some(paid) => {
            tracing::info!(order_id = paid.id, session_id = %session.id, "Order paid");
            publish_order_event(state, event_types::ORDER_PAID, &paid, None, json!({})).await;
        }
        None if order.status_id == OrderStatus::Cancelled.id() => {
            tracing::warn!(
                order_id = order.id,
                session_id = %session.id,
                "Payment received for a cancelled order; refund required",
            );
        }
        None => {
            tracing::info!(order_id = order.id, "Duplicate payment notification ignored");
        }
    }
    Ok(())
}

async fn handle_expired(state: &AppState, session: &CheckoutSessionObject) -> AppResult<()> {
    let Some(order) = OrderRepo::find_by_checkout_session(&state.pool, &session.id).await? else {
        // A newer session replaced this one, or the order is unknown.
        tracing::debug!(session_id = %session.id, "Expired session has no order");
        return Ok(());
    };

    let cancelled = OrderRepo::transition_status(
        &state.pool,
        order.id,
        OrderStatus::Pending,
        OrderStatus::Cancelled,
    )
    .await?;
    if let Some(cancelled) = cancelled {
        tracing::info!(order_id = cancelled.id, "Order cancelled after checkout expired");
        publish_order_event(
            state,
            event_types::ORDER_STATUS_CHANGED,
            &cancelled,
            None,
            json!({ "from": OrderStatus::Pending.name(), "to": OrderStatus::Cancelled.name() }),
        )
        .await;
    }
    Ok(())
}
