//! Stock ledger operations.
//!
//! `stock_on_hand` is only ever mutated here, through the explicit
//! transaction handle of the status transition that triggered the movement.
//! A reservation either decrements every line or nothing: the first
//! insufficient line aborts with `InsufficientStock` and the caller's
//! rollback discards any decrements already applied.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectionTrait, EntityTrait};
use tracing::debug;

use crate::entities::{order_line, product};
use crate::errors::ServiceError;

/// Threshold crossing produced by a decrement, reported so the caller can
/// enqueue a low-stock alert.
#[derive(Debug, Clone)]
pub struct LowStockCrossing {
    pub product: product::Model,
    pub critical: bool,
}

/// Checks and decrements stock for every order line.
pub async fn reserve_lines<C: ConnectionTrait>(
    conn: &C,
    lines: &[order_line::Model],
) -> Result<Vec<LowStockCrossing>, ServiceError> {
    let mut crossings = Vec::new();

    for line in lines {
        let product = product::Entity::find_by_id(line.product_id)
            .one(conn)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", line.product_id))
            })?;

        if product.stock_on_hand < line.quantity {
            return Err(ServiceError::InsufficientStock(format!(
                "product '{}' has {} on hand, {} requested",
                product.name, product.stock_on_hand, line.quantity
            )));
        }

        let previous = product.stock_on_hand;
        let current = previous - line.quantity;

        let mut active: product::ActiveModel = product.clone().into();
        active.stock_on_hand = Set(current);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(conn).await.map_err(ServiceError::from_db)?;

        debug!(
            product_id = %updated.id,
            previous,
            current,
            "stock reserved"
        );

        // Alert only on crossing, not on every decrement below the line.
        if current <= updated.alert_threshold && previous > updated.alert_threshold
            || current <= updated.critical_threshold && previous > updated.critical_threshold
        {
            crossings.push(LowStockCrossing {
                critical: current <= updated.critical_threshold,
                product: updated,
            });
        }
    }

    Ok(crossings)
}

/// Restores stock for every order line (inverse of [`reserve_lines`]).
pub async fn restore_lines<C: ConnectionTrait>(
    conn: &C,
    lines: &[order_line::Model],
) -> Result<(), ServiceError> {
    for line in lines {
        let product = product::Entity::find_by_id(line.product_id)
            .one(conn)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", line.product_id))
            })?;

        let current = product.stock_on_hand + line.quantity;
        let mut active: product::ActiveModel = product.into();
        active.stock_on_hand = Set(current);
        active.updated_at = Set(Some(Utc::now()));
        active.update(conn).await.map_err(ServiceError::from_db)?;

        debug!(product_id = %line.product_id, current, "stock restored");
    }

    Ok(())
}
