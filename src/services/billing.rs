//! Idempotent dependent-record creators.
//!
//! Each function is a pure function of (source aggregate, transaction
//! handle) → existing-or-created record: look up by the natural foreign key,
//! return the existing row unchanged if present, otherwise compute the
//! derived fields and insert. This makes the orchestrator safe to re-run and
//! safe to call from multiple trigger points without duplication.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
};
use uuid::Uuid;

use crate::entities::{
    delivery::{self, DeliveryStatus},
    invoice::{self, InvoicePaymentStatus},
    order::{self, OrderStatus},
    order_line, payment,
    sale::{self, SaleStatus},
    sale_line,
};
use crate::errors::ServiceError;

pub const PAYMENT_METHOD_BALANCE: &str = "balance";

/// Returns the order's delivery, creating it with the client's address if it
/// does not exist yet.
pub async fn ensure_delivery<C: ConnectionTrait>(
    conn: &C,
    order: &order::Model,
    client_address: &str,
    status: DeliveryStatus,
) -> Result<delivery::Model, ServiceError> {
    if let Some(existing) = delivery::Entity::find()
        .filter(delivery::Column::OrderId.eq(order.id))
        .one(conn)
        .await
        .map_err(ServiceError::from_db)?
    {
        return Ok(existing);
    }

    let now = Utc::now();
    delivery::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        sale_id: Set(None),
        status: Set(status),
        address: Set(client_address.to_string()),
        delivery_date: Set(None),
        created_at: Set(now),
        updated_at: Set(None),
    }
    .insert(conn)
    .await
    .map_err(ServiceError::from_db)
}

/// Returns the order's sale, creating it (with mirrored sale lines and a
/// total recomputed from those lines) if absent.
pub async fn ensure_sale<C: ConnectionTrait>(
    conn: &C,
    order: &order::Model,
    lines: &[order_line::Model],
) -> Result<sale::Model, ServiceError> {
    if let Some(existing) = sale::Entity::find()
        .filter(sale::Column::OrderId.eq(order.id))
        .one(conn)
        .await
        .map_err(ServiceError::from_db)?
    {
        return Ok(existing);
    }

    let now = Utc::now();
    let total: Decimal = lines
        .iter()
        .map(|line| line.unit_price * Decimal::from(line.quantity))
        .sum();

    let created = sale::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        client_id: Set(order.client_id),
        vendor_id: Set(order.vendor_id),
        total_amount: Set(total),
        status: Set(SaleStatus::Completed),
        created_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(ServiceError::from_db)?;

    for line in lines {
        sale_line::ActiveModel {
            id: Set(Uuid::new_v4()),
            sale_id: Set(created.id),
            product_id: Set(line.product_id),
            quantity_sold: Set(line.quantity),
            unit_price: Set(line.unit_price),
            created_at: Set(now),
        }
        .insert(conn)
        .await
        .map_err(ServiceError::from_db)?;
    }

    Ok(created)
}

/// Returns the sale's invoice, creating it if absent. Payment status is
/// derived from the order status: cancelled orders yield cancelled invoices,
/// anything else is considered settled.
pub async fn ensure_invoice<C: ConnectionTrait>(
    conn: &C,
    sale: &sale::Model,
    order_status: OrderStatus,
) -> Result<invoice::Model, ServiceError> {
    if let Some(existing) = invoice::Entity::find()
        .filter(invoice::Column::SaleId.eq(sale.id))
        .one(conn)
        .await
        .map_err(ServiceError::from_db)?
    {
        return Ok(existing);
    }

    let payment_status = if order_status == OrderStatus::Cancelled {
        InvoicePaymentStatus::Cancelled
    } else {
        InvoicePaymentStatus::Paid
    };

    invoice::ActiveModel {
        id: Set(Uuid::new_v4()),
        sale_id: Set(sale.id),
        order_id: Set(sale.order_id),
        subtotal: Set(sale.total_amount),
        total_amount: Set(sale.total_amount),
        payment_status: Set(payment_status),
        issued_at: Set(Utc::now()),
    }
    .insert(conn)
    .await
    .map_err(ServiceError::from_db)
}

/// Returns the invoice's payment, creating it if absent.
pub async fn ensure_payment<C: ConnectionTrait>(
    conn: &C,
    invoice: &invoice::Model,
) -> Result<payment::Model, ServiceError> {
    if let Some(existing) = payment::Entity::find()
        .filter(payment::Column::InvoiceId.eq(invoice.id))
        .one(conn)
        .await
        .map_err(ServiceError::from_db)?
    {
        return Ok(existing);
    }

    payment::ActiveModel {
        id: Set(Uuid::new_v4()),
        invoice_id: Set(invoice.id),
        order_id: Set(invoice.order_id),
        amount_paid: Set(invoice.total_amount),
        method: Set(PAYMENT_METHOD_BALANCE.to_string()),
        paid_at: Set(Utc::now()),
    }
    .insert(conn)
    .await
    .map_err(ServiceError::from_db)
}

/// Links the delivery to its sale and stamps the delivery as completed.
pub async fn backfill_delivery_sale<C: ConnectionTrait>(
    conn: &C,
    delivery: delivery::Model,
    sale_id: Uuid,
) -> Result<delivery::Model, ServiceError> {
    let mut active: delivery::ActiveModel = delivery.into();
    active.sale_id = Set(Some(sale_id));
    active.status = Set(DeliveryStatus::Delivered);
    active.delivery_date = Set(Some(Utc::now()));
    active.updated_at = Set(Some(Utc::now()));
    active.update(conn).await.map_err(ServiceError::from_db)
}
