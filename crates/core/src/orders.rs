//! Order lifecycle rules and pricing arithmetic.
//!
//! Transitions:
//!
//! ```text
//! pending    -> paid | cancelled
//! paid       -> processing | cancelled | refunded
//! processing -> shipped | cancelled
//! shipped    -> delivered
//! delivered, cancelled, refunded are terminal
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::status::OrderStatus;
use crate::types::{Cents, DbId};

/// Largest quantity accepted for a single order or cart line.
pub const MAX_LINE_QUANTITY: i32 = 99;

/// Largest number of distinct lines accepted in one order.
pub const MAX_ORDER_LINES: usize = 50;

impl OrderStatus {
    /// Whether an order in `self` may move to `next`.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid)
                | (Pending, Cancelled)
                | (Paid, Processing)
                | (Paid, Cancelled)
                | (Paid, Refunded)
                | (Processing, Shipped)
                | (Processing, Cancelled)
                | (Shipped, Delivered)
        )
    }

    /// No further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }

    /// Moving into this status returns the reserved stock to the catalog.
    pub fn restocks(self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Refunded)
    }

    /// Customers may cancel their own orders only before fulfilment starts.
    pub fn is_customer_cancellable(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Paid)
    }
}

/// Reject a transition that the lifecycle does not allow.
pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<(), CoreError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(CoreError::Conflict(format!(
            "Order cannot move from '{from}' to '{to}'"
        )))
    }
}

/// One requested line: a product and how many units of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: DbId,
    pub quantity: i32,
}

/// Validate a per-line quantity.
pub fn validate_quantity(quantity: i32) -> Result<(), CoreError> {
    if (1..=MAX_LINE_QUANTITY).contains(&quantity) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Quantity must be between 1 and {MAX_LINE_QUANTITY}, got {quantity}"
        )))
    }
}

/// Merge duplicate product lines and validate the result.
///
/// Order of first appearance is preserved so that item ordering in the
/// created order matches the request.
pub fn merge_lines(lines: &[LineRequest]) -> Result<Vec<LineRequest>, CoreError> {
    if lines.is_empty() {
        return Err(CoreError::Validation(
            "An order must contain at least one item".into(),
        ));
    }

    let mut merged: Vec<LineRequest> = Vec::with_capacity(lines.len());
    let mut positions: HashMap<DbId, usize> = HashMap::new();

    for line in lines {
        validate_quantity(line.quantity)?;
        match positions.get(&line.product_id) {
            Some(&idx) => merged[idx].quantity += line.quantity,
            None => {
                positions.insert(line.product_id, merged.len());
                merged.push(*line);
            }
        }
    }

    if merged.len() > MAX_ORDER_LINES {
        return Err(CoreError::Validation(format!(
            "An order may contain at most {MAX_ORDER_LINES} distinct products"
        )));
    }
    for line in &merged {
        validate_quantity(line.quantity)?;
    }

    Ok(merged)
}

/// Price of `quantity` units at `unit_price`.
pub fn line_total(unit_price: Cents, quantity: i32) -> Result<Cents, CoreError> {
    unit_price
        .checked_mul(i64::from(quantity))
        .ok_or_else(|| CoreError::Validation("Line total overflows".into()))
}

/// Sum of `(unit_price, quantity)` pairs.
pub fn order_total<I>(lines: I) -> Result<Cents, CoreError>
where
    I: IntoIterator<Item = (Cents, i32)>,
{
    lines.into_iter().try_fold(0i64, |acc, (price, qty)| {
        let line = line_total(price, qty)?;
        acc.checked_add(line)
            .ok_or_else(|| CoreError::Validation("Order total overflows".into()))
    })
}
