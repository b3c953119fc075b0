//! The order-fulfillment state machine.
//!
//! `update_status` is the single entry point for moving an order through its
//! lifecycle. Stock movement, dependent-record creation and event enqueueing
//! all share the one transaction opened here; any failure leaves the order
//! at its prior status with stock untouched.

use std::sync::Arc;

use chrono::Utc;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, TransactionTrait,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::delivery::DeliveryStatus;
use crate::entities::order::{self, Entity as OrderEntity, OrderStatus};
use crate::entities::order_line::{self, Entity as OrderLineEntity};
use crate::entities::user::UserRole;
use crate::entities::{client, vendor};
use crate::errors::ServiceError;
use crate::events::{outbox, Event};
use crate::services::billing;
use crate::services::orders::{model_to_response, OrderResponse};
use crate::services::stock;

lazy_static! {
    static ref STATUS_TRANSITIONS: IntCounter = IntCounter::new(
        "order_status_transitions_total",
        "Total number of applied order status transitions"
    )
    .expect("metric can be created");
    static ref STATUS_TRANSITION_REJECTIONS: IntCounter = IntCounter::new(
        "order_status_transition_rejections_total",
        "Total number of rejected order status transitions"
    )
    .expect("metric can be created");
}

#[derive(Clone)]
pub struct FulfillmentService {
    db: Arc<DatabaseConnection>,
}

impl FulfillmentService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Applies a status transition on behalf of the owning vendor.
    #[instrument(skip(self, actor), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        actor: &AuthUser,
    ) -> Result<OrderResponse, ServiceError> {
        let result = self.apply_transition(order_id, new_status, actor).await;
        match &result {
            Ok(_) => STATUS_TRANSITIONS.inc(),
            Err(e) => {
                STATUS_TRANSITION_REJECTIONS.inc();
                warn!(order_id = %order_id, error = %e, "status transition rejected");
            }
        }
        result
    }

    async fn apply_transition(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        actor: &AuthUser,
    ) -> Result<OrderResponse, ServiceError> {
        if actor.role != UserRole::Vendor {
            return Err(ServiceError::Forbidden(
                "only the owning vendor may update an order's status".to_string(),
            ));
        }

        let txn = self.db.begin().await.map_err(ServiceError::from_db)?;

        let vendor = vendor::Entity::find()
            .filter(vendor::Column::UserId.eq(actor.id))
            .one(&txn)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| {
                ServiceError::Forbidden("no vendor profile for this account".to_string())
            })?;

        let order = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if order.vendor_id != vendor.id {
            return Err(ServiceError::Forbidden(
                "order belongs to another vendor".to_string(),
            ));
        }

        let old_status = order.status;
        if old_status.is_terminal() {
            return Err(ServiceError::InvalidTransition(format!(
                "order is already {} and can no longer change",
                old_status
            )));
        }
        if !old_status.can_transition_to(new_status) {
            return Err(ServiceError::InvalidTransition(format!(
                "cannot move an order from {} to {}",
                old_status, new_status
            )));
        }

        let lines = OrderLineEntity::find()
            .filter(order_line::Column::OrderId.eq(order.id))
            .all(&txn)
            .await
            .map_err(ServiceError::from_db)?;

        let mut low_stock = Vec::new();
        match new_status {
            // First stock-affecting status: check and decrement, all or
            // nothing. A later validated -> preparing move does not
            // decrement again.
            OrderStatus::Validated | OrderStatus::Preparing => {
                if old_status == OrderStatus::Pending {
                    low_stock = stock::reserve_lines(&txn, &lines).await?;
                }
            }
            OrderStatus::Cancelled => {
                if old_status.holds_stock() {
                    stock::restore_lines(&txn, &lines).await?;
                }
            }
            OrderStatus::Shipped => {
                let address = client_address(&txn, order.client_id).await?;
                billing::ensure_delivery(&txn, &order, &address, DeliveryStatus::Shipped).await?;
            }
            OrderStatus::Delivered => {
                let address = client_address(&txn, order.client_id).await?;
                let delivery =
                    billing::ensure_delivery(&txn, &order, &address, DeliveryStatus::Delivered)
                        .await?;
                let sale = billing::ensure_sale(&txn, &order, &lines).await?;
                let invoice = billing::ensure_invoice(&txn, &sale, new_status).await?;
                billing::ensure_payment(&txn, &invoice).await?;
                billing::backfill_delivery_sale(&txn, delivery, sale.id).await?;
            }
            OrderStatus::Pending => {}
        }

        let mut active: order::ActiveModel = order.clone().into();
        active.status = Set(new_status);
        active.updated_at = Set(Some(Utc::now()));
        active.version = Set(order.version + 1);
        let updated = active.update(&txn).await.map_err(ServiceError::from_db)?;

        outbox::enqueue(
            &txn,
            &Event::OrderStatusChanged {
                order_id: updated.id,
                order_number: updated.order_number.clone(),
                client_id: updated.client_id,
                old_status,
                new_status,
            },
        )
        .await?;
        for crossing in low_stock {
            outbox::enqueue(
                &txn,
                &Event::LowStockAlert {
                    product_id: crossing.product.id,
                    product_name: crossing.product.name.clone(),
                    vendor_id: crossing.product.vendor_id,
                    stock_on_hand: crossing.product.stock_on_hand,
                    critical: crossing.critical,
                },
            )
            .await?;
        }

        txn.commit().await.map_err(ServiceError::from_db)?;

        info!(
            order_id = %updated.id,
            old_status = %old_status,
            new_status = %new_status,
            "order status updated"
        );

        Ok(model_to_response(updated))
    }
}

async fn client_address(
    txn: &DatabaseTransaction,
    client_id: Uuid,
) -> Result<String, ServiceError> {
    let client = client::Entity::find_by_id(client_id)
        .one(txn)
        .await
        .map_err(ServiceError::from_db)?
        .ok_or_else(|| ServiceError::NotFound(format!("Client {} not found", client_id)))?;
    Ok(client.address)
}
