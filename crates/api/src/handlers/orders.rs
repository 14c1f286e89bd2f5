//! Handlers for `/orders` and `/admin/orders`.
//!
//! Placement reserves stock inside a single transaction (see
//! [`OrderRepo::create_with_items`]). Status changes go through
//! [`OrderRepo::transition_status`], which only succeeds if the order is
//! still in the status the handler validated against.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use vitashop_core::error::CoreError;
use vitashop_core::orders::{merge_lines, validate_transition, LineRequest};
use vitashop_core::status::OrderStatus;
use vitashop_core::types::DbId;
use vitashop_db::models::order::{CreateOrder, Order, OrderItem, OrderQuery};
use vitashop_db::repositories::{AddressRepo, CartRepo, OrderRepo, UserRepo};
use vitashop_events::{event_types, PlatformEvent};

use crate::error::{AppError, AppResult};
use crate::handlers::found;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::query::{PageParams, StatusPageParams};
use crate::response::{DataResponse, PaginatedResponse};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreateOrderRequest {
    /// Lines to order. When omitted the user's cart is ordered instead.
    pub items: Option<Vec<LineRequest>>,
    /// Shipping address; falls back to the user's default address.
    pub address_id: Option<DbId>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

/// An order with its status name resolved.
#[derive(Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub status: OrderStatus,
}

/// An order together with its line items.
#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
}

impl OrderView {
    fn new(order: Order) -> AppResult<Self> {
        let status = OrderStatus::from_id(order.status_id)?;
        Ok(Self { order, status })
    }
}

impl OrderDetail {
    fn new(order: Order, items: Vec<OrderItem>) -> AppResult<Self> {
        let status = OrderStatus::from_id(order.status_id)?;
        Ok(Self {
            order,
            status,
            items,
        })
    }
}

/// Publish an order event addressed to the order's owner.
///
/// Runs after the database work committed, so a failed owner lookup is
/// logged rather than surfaced to the caller.
pub(crate) async fn publish_order_event(
    state: &AppState,
    event_type: &str,
    order: &Order,
    actor_user_id: Option<DbId>,
    extra: serde_json::Value,
) {
    let owner = match UserRepo::find_by_id(&state.pool, order.user_id).await {
        Ok(owner) => owner,
        Err(e) => {
            tracing::warn!(error = %e, order_id = order.id, event_type, "Owner lookup failed");
            None
        }
    };

    let mut payload = json!({
        "total_cents": order.total_cents,
        "currency": order.currency,
    });
    if let Some(owner) = owner {
        payload["email"] = json!(owner.email);
        payload["first_name"] = json!(owner.first_name);
    }
    if let (Some(target), serde_json::Value::Object(extra)) = (payload.as_object_mut(), extra) {
        target.extend(extra);
    }

    let mut event = PlatformEvent::new(event_type)
        .with_source("order", order.id)
        .with_payload(payload);
    if let Some(actor) = actor_user_id {
        event = event.with_actor(actor);
    }
    state.event_bus.publish(event);
}

/// Resolve the lines to order and whether the cart should be emptied.
async fn resolve_lines(
    state: &AppState,
    user_id: DbId,
    items: Option<Vec<LineRequest>>,
) -> AppResult<(Vec<LineRequest>, bool)> {
    match items {
        Some(items) => Ok((merge_lines(&items)?, false)),
        None => {
            let cart: Vec<LineRequest> = CartRepo::list_for_user(&state.pool, user_id)
                .await?
                .into_iter()
                .map(|line| LineRequest {
                    product_id: line.product_id,
                    quantity: line.quantity,
                })
                .collect();
            if cart.is_empty() {
                return Err(AppError::BadRequest("Cart is empty".into()));
            }
            Ok((merge_lines(&cart)?, true))
        }
    }
}

async fn resolve_shipping_address(
    state: &AppState,
    user_id: DbId,
    address_id: Option<DbId>,
) -> AppResult<Option<serde_json::Value>> {
    let address = match address_id {
        Some(id) => Some(found(
            AddressRepo::find_for_user(&state.pool, id, user_id).await?,
            "Address",
            id,
        )?),
        None => AddressRepo::find_default(&state.pool, user_id).await?,
    };
    Ok(address.map(|a| a.snapshot()))
}

/// Load an order visible to `user`: its own orders, or any order for admins.
async fn load_visible_order(state: &AppState, user: &AuthUser, id: DbId) -> AppResult<Order> {
    let order = if user.is_admin() {
        OrderRepo::find_by_id(&state.pool, id).await?
    } else {
        OrderRepo::find_for_user(&state.pool, id, user.user_id).await?
    };
    found(order, "Order", id)
}

/// Apply a validated transition, or 409 if the order moved underneath us.
async fn apply_transition(
    state: &AppState,
    order_id: DbId,
    from: OrderStatus,
    to: OrderStatus,
) -> AppResult<Order> {
    OrderRepo::transition_status(&state.pool, order_id, from, to)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "Order status changed concurrently; reload and retry".into(),
            ))
        })
}

/// POST /api/orders
pub async fn create(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<OrderDetail>>)> {
    let (lines, clear_cart) = resolve_lines(&state, auth_user.user_id, input.items).await?;
    let shipping_address =
        resolve_shipping_address(&state, auth_user.user_id, input.address_id).await?;

    let (order, items) = OrderRepo::create_with_items(
        &state.pool,
        &CreateOrder {
            user_id: auth_user.user_id,
            lines,
            currency: state.config.payment.currency.clone(),
            shipping_address,
            clear_cart,
        },
    )
    .await?;

    tracing::info!(
        order_id = order.id,
        user_id = auth_user.user_id,
        total_cents = order.total_cents,
        lines = items.len(),
        from_cart = clear_cart,
        "Order placed",
    );
    publish_order_event(
        &state,
        event_types::ORDER_CREATED,
        &order,
        Some(auth_user.user_id),
        json!({}),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: OrderDetail::new(order, items)?,
        }),
    ))
}

/// GET /api/orders?page=&limit=
pub async fn list_mine(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<PageParams>,
) -> AppResult<Json<PaginatedResponse<OrderView>>> {
    let page = params.resolve();
    let query = OrderQuery {
        user_id: Some(auth_user.user_id),
        status_id: None,
        limit: page.limit,
        offset: page.offset(),
    };

    let orders = OrderRepo::list(&state.pool, &query).await?;
    let total = OrderRepo::count(&state.pool, &query).await?;

    Ok(Json(PaginatedResponse {
        data: orders
            .into_iter()
            .map(OrderView::new)
            .collect::<AppResult<_>>()?,
        meta: page.meta(total),
    }))
}

/// GET /api/orders/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<OrderDetail>>> {
    let order = load_visible_order(&state, &auth_user, id).await?;
    let items = OrderRepo::items_for_order(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: OrderDetail::new(order, items)?,
    }))
}

/// POST /api/orders/{id}/cancel
///
/// Owners may cancel before fulfilment starts. Reserved stock is returned.
pub async fn cancel(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<OrderView>>> {
    let order = found(
        OrderRepo::find_for_user(&state.pool, id, auth_user.user_id).await?,
        "Order",
        id,
    )?;
    let from = OrderStatus::from_id(order.status_id)?;
    if !from.is_customer_cancellable() {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Orders in status '{from}' can no longer be cancelled"
        ))));
    }

    let order = apply_transition(&state, id, from, OrderStatus::Cancelled).await?;
    if from == OrderStatus::Paid {
        tracing::warn!(order_id = id, "Paid order cancelled; refund must be issued with the processor");
    }
    tracing::info!(order_id = id, user_id = auth_user.user_id, %from, "Order cancelled by customer");

    publish_order_event(
        &state,
        event_types::ORDER_STATUS_CHANGED,
        &order,
        Some(auth_user.user_id),
        json!({ "from": from.name(), "to": OrderStatus::Cancelled.name() }),
    )
    .await;

    Ok(Json(DataResponse {
        data: OrderView::new(order)?,
    }))
}

/// GET /api/admin/orders?status=&page=&limit=
pub async fn admin_list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<StatusPageParams>,
) -> AppResult<Json<PaginatedResponse<OrderView>>> {
    let page = params.page();
    let status_id = params
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(OrderStatus::from_name)
        .transpose()?
        .map(OrderStatus::id);

    let query = OrderQuery {
        user_id: None,
        status_id,
        limit: page.limit,
        offset: page.offset(),
    };
    let orders = OrderRepo::list(&state.pool, &query).await?;
    let total = OrderRepo::count(&state.pool, &query).await?;

    Ok(Json(PaginatedResponse {
        data: orders
            .into_iter()
            .map(OrderView::new)
            .collect::<AppResult<_>>()?,
        meta: page.meta(total),
    }))
}

/// PATCH /api/admin/orders/{id}/status
pub async fn admin_update_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<DataResponse<OrderView>>> {
    let order = found(OrderRepo::find_by_id(&state.pool, id).await?, "Order", id)?;
    let from = OrderStatus::from_id(order.status_id)?;
    let to = OrderStatus::from_name(&input.status)?;
    validate_transition(from, to)?;

    let order = apply_transition(&state, id, from, to).await?;
    tracing::info!(order_id = id, user_id = admin.user_id, %from, %to, "Order status updated");

    publish_order_event(
        &state,
        event_types::ORDER_STATUS_CHANGED,
        &order,
        Some(admin.user_id),
        json!({ "from": from.name(), "to": to.name() }),
    )
    .await;

    Ok(Json(DataResponse {
        data: OrderView::new(order)?,
    }))
}
