//! The order-fulfillment state machine end to end: stock movement, the
//! delivered chain (delivery, sale, invoice, payment), terminal statuses,
//! ownership, and atomicity under insufficient stock.

mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use common::{actor_for, TestEnv};
use vendora_api::auth::AuthUser;
use vendora_api::entities::delivery::{self, DeliveryStatus};
use vendora_api::entities::invoice::{self, InvoicePaymentStatus};
use vendora_api::entities::notification::{self, NotificationKind};
use vendora_api::entities::order::OrderStatus;
use vendora_api::entities::user::UserRole;
use vendora_api::entities::{payment, product, sale, sale_line};
use vendora_api::errors::ServiceError;
use vendora_api::services::orders::{CreateOrderLine, OrderResponse};

struct Flow {
    env: TestEnv,
    vendor_actor: AuthUser,
    client_actor: AuthUser,
    product_a: product::Model,
    product_b: product::Model,
    order: OrderResponse,
}

/// Seeds the reference scenario: 3 units of A (stock 10 at 5.00) and
/// 2 units of B (stock 4 at 7.50) from one vendor.
async fn reference_order() -> Flow {
    let env = TestEnv::new().await;
    let (vendor_user, vendor) = env.seed_vendor("vendor@shop.test").await;
    let (client_user, _) = env.seed_client("client@buy.test", dec!(100.00)).await;

    let product_a = env
        .seed_product(vendor.id, "Product A", dec!(5.00), 10)
        .await;
    let product_b = env
        .seed_product(vendor.id, "Product B", dec!(7.50), 4)
        .await;

    let client_actor = actor_for(&client_user);
    let mut created = env
        .services
        .orders
        .create_orders(
            &client_actor,
            vec![
                CreateOrderLine {
                    product_id: product_a.id,
                    quantity: 3,
                    unit_price: None,
                },
                CreateOrderLine {
                    product_id: product_b.id,
                    quantity: 2,
                    unit_price: None,
                },
            ],
        )
        .await
        .expect("order creates");
    let order = created.remove(0);

    Flow {
        vendor_actor: actor_for(&vendor_user),
        client_actor,
        env,
        product_a,
        product_b,
        order,
    }
}

#[tokio::test]
async fn validated_decrements_stock() {
    let flow = reference_order().await;

    let updated = flow
        .env
        .services
        .fulfillment
        .update_status(flow.order.id, OrderStatus::Validated, &flow.vendor_actor)
        .await
        .expect("transition applies");

    assert_eq!(updated.status, OrderStatus::Validated);
    assert_eq!(flow.env.stock_of(flow.product_a.id).await, 7);
    assert_eq!(flow.env.stock_of(flow.product_b.id).await, 2);
}

#[tokio::test]
async fn cancel_after_validated_restores_stock() {
    let flow = reference_order().await;

    flow.env
        .services
        .fulfillment
        .update_status(flow.order.id, OrderStatus::Validated, &flow.vendor_actor)
        .await
        .expect("validated");
    flow.env
        .services
        .fulfillment
        .update_status(flow.order.id, OrderStatus::Cancelled, &flow.vendor_actor)
        .await
        .expect("cancelled");

    assert_eq!(flow.env.stock_of(flow.product_a.id).await, 10);
    assert_eq!(flow.env.stock_of(flow.product_b.id).await, 4);
}

#[tokio::test]
async fn cancel_from_pending_leaves_stock_alone() {
    let flow = reference_order().await;

    flow.env
        .services
        .fulfillment
        .update_status(flow.order.id, OrderStatus::Cancelled, &flow.vendor_actor)
        .await
        .expect("cancelled");

    assert_eq!(flow.env.stock_of(flow.product_a.id).await, 10);
    assert_eq!(flow.env.stock_of(flow.product_b.id).await, 4);
}

#[tokio::test]
async fn validated_to_preparing_does_not_decrement_twice() {
    let flow = reference_order().await;

    flow.env
        .services
        .fulfillment
        .update_status(flow.order.id, OrderStatus::Validated, &flow.vendor_actor)
        .await
        .expect("validated");
    flow.env
        .services
        .fulfillment
        .update_status(flow.order.id, OrderStatus::Preparing, &flow.vendor_actor)
        .await
        .expect("preparing");

    assert_eq!(flow.env.stock_of(flow.product_a.id).await, 7);
    assert_eq!(flow.env.stock_of(flow.product_b.id).await, 2);
}

#[tokio::test]
async fn insufficient_stock_rejects_whole_transition() {
    let env = TestEnv::new().await;
    let (vendor_user, vendor) = env.seed_vendor("vendor@shop.test").await;
    let (client_user, _) = env.seed_client("client@buy.test", dec!(100.00)).await;

    // A has plenty and is listed first; B cannot cover the requested two.
    let product_a = env
        .seed_product(vendor.id, "Product A", dec!(5.00), 10)
        .await;
    let product_b = env.seed_product(vendor.id, "Product B", dec!(7.50), 1).await;

    let mut created = env
        .services
        .orders
        .create_orders(
            &actor_for(&client_user),
            vec![
                CreateOrderLine {
                    product_id: product_a.id,
                    quantity: 3,
                    unit_price: None,
                },
                CreateOrderLine {
                    product_id: product_b.id,
                    quantity: 2,
                    unit_price: None,
                },
            ],
        )
        .await
        .expect("order creates");
    let order = created.remove(0);

    let result = env
        .services
        .fulfillment
        .update_status(order.id, OrderStatus::Validated, &actor_for(&vendor_user))
        .await;
    assert_matches!(result, Err(ServiceError::InsufficientStock(_)));

    // No partial decrement, status unchanged.
    assert_eq!(env.stock_of(product_a.id).await, 10);
    assert_eq!(env.stock_of(product_b.id).await, 1);
    let unchanged = env
        .services
        .orders
        .get_order(&actor_for(&vendor_user), order.id)
        .await
        .unwrap();
    assert_eq!(unchanged.status, OrderStatus::Pending);
}

#[tokio::test]
async fn delivered_from_preparing_creates_the_billing_chain() {
    let flow = reference_order().await;

    flow.env
        .services
        .fulfillment
        .update_status(flow.order.id, OrderStatus::Preparing, &flow.vendor_actor)
        .await
        .expect("preparing");
    flow.env
        .services
        .fulfillment
        .update_status(flow.order.id, OrderStatus::Delivered, &flow.vendor_actor)
        .await
        .expect("delivered");

    // Exactly one sale, mirroring the order lines.
    let sales = sale::Entity::find()
        .filter(sale::Column::OrderId.eq(flow.order.id))
        .all(flow.env.db.as_ref())
        .await
        .unwrap();
    assert_eq!(sales.len(), 1);
    let sale = &sales[0];
    assert_eq!(sale.total_amount, dec!(29.00));

    let sale_lines = sale_line::Entity::find()
        .filter(sale_line::Column::SaleId.eq(sale.id))
        .all(flow.env.db.as_ref())
        .await
        .unwrap();
    assert_eq!(sale_lines.len(), 2);
    let sold: i32 = sale_lines.iter().map(|l| l.quantity_sold).sum();
    assert_eq!(sold, 5);

    // Exactly one paid invoice.
    let invoices = invoice::Entity::find()
        .filter(invoice::Column::SaleId.eq(sale.id))
        .all(flow.env.db.as_ref())
        .await
        .unwrap();
    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0].payment_status, InvoicePaymentStatus::Paid);
    assert_eq!(invoices[0].total_amount, dec!(29.00));

    // Exactly one payment covering the invoice.
    let payments = payment::Entity::find()
        .filter(payment::Column::InvoiceId.eq(invoices[0].id))
        .all(flow.env.db.as_ref())
        .await
        .unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].amount_paid, dec!(29.00));

    // Delivery exists, carries the client address and the backfilled sale id.
    let deliveries = delivery::Entity::find()
        .filter(delivery::Column::OrderId.eq(flow.order.id))
        .all(flow.env.db.as_ref())
        .await
        .unwrap();
    assert_eq!(deliveries.len(), 1);
    let delivery = &deliveries[0];
    assert_eq!(delivery.sale_id, Some(sale.id));
    assert_eq!(delivery.status, DeliveryStatus::Delivered);
    assert!(delivery.delivery_date.is_some());
    assert_eq!(delivery.address, "12 Market Street, Springfield");

    // The client is notified once per transition after the outbox drains.
    flow.env.deliver_events().await;
    let client_notifications = notification::Entity::find()
        .filter(notification::Column::UserId.eq(flow.client_actor.id))
        .filter(notification::Column::Kind.eq(NotificationKind::OrderStatus))
        .all(flow.env.db.as_ref())
        .await
        .unwrap();
    assert_eq!(client_notifications.len(), 2, "preparing + delivered");
}

#[tokio::test]
async fn shipped_creates_delivery_and_delivered_reuses_it() {
    let flow = reference_order().await;

    flow.env
        .services
        .fulfillment
        .update_status(flow.order.id, OrderStatus::Validated, &flow.vendor_actor)
        .await
        .expect("validated");
    flow.env
        .services
        .fulfillment
        .update_status(flow.order.id, OrderStatus::Shipped, &flow.vendor_actor)
        .await
        .expect("shipped");

    let after_shipped = delivery::Entity::find()
        .filter(delivery::Column::OrderId.eq(flow.order.id))
        .all(flow.env.db.as_ref())
        .await
        .unwrap();
    assert_eq!(after_shipped.len(), 1);
    assert_eq!(after_shipped[0].status, DeliveryStatus::Shipped);
    assert_eq!(after_shipped[0].sale_id, None);

    flow.env
        .services
        .fulfillment
        .update_status(flow.order.id, OrderStatus::Delivered, &flow.vendor_actor)
        .await
        .expect("delivered");

    let after_delivered = delivery::Entity::find()
        .filter(delivery::Column::OrderId.eq(flow.order.id))
        .all(flow.env.db.as_ref())
        .await
        .unwrap();
    assert_eq!(after_delivered.len(), 1, "delivery is reused, not duplicated");
    assert_eq!(after_delivered[0].id, after_shipped[0].id);
    assert_eq!(after_delivered[0].status, DeliveryStatus::Delivered);
    assert!(after_delivered[0].sale_id.is_some());
}

#[tokio::test]
async fn terminal_statuses_are_immutable() {
    let flow = reference_order().await;

    flow.env
        .services
        .fulfillment
        .update_status(flow.order.id, OrderStatus::Preparing, &flow.vendor_actor)
        .await
        .expect("preparing");
    flow.env
        .services
        .fulfillment
        .update_status(flow.order.id, OrderStatus::Delivered, &flow.vendor_actor)
        .await
        .expect("delivered");

    for next in [
        OrderStatus::Pending,
        OrderStatus::Validated,
        OrderStatus::Cancelled,
    ] {
        let result = flow
            .env
            .services
            .fulfillment
            .update_status(flow.order.id, next, &flow.vendor_actor)
            .await;
        assert_matches!(result, Err(ServiceError::InvalidTransition(_)));
    }
}

#[tokio::test]
async fn undeclared_edges_are_rejected() {
    let flow = reference_order().await;

    // pending -> shipped skips the stock checkpoint and is not in the table.
    let result = flow
        .env
        .services
        .fulfillment
        .update_status(flow.order.id, OrderStatus::Shipped, &flow.vendor_actor)
        .await;
    assert_matches!(result, Err(ServiceError::InvalidTransition(_)));
}

#[tokio::test]
async fn only_the_owning_vendor_may_transition() {
    let flow = reference_order().await;
    let (other_vendor_user, _) = flow.env.seed_vendor("other@shop.test").await;

    let result = flow
        .env
        .services
        .fulfillment
        .update_status(
            flow.order.id,
            OrderStatus::Validated,
            &actor_for(&other_vendor_user),
        )
        .await;
    assert_matches!(result, Err(ServiceError::Forbidden(_)));

    // The client cannot fulfill their own order either.
    let result = flow
        .env
        .services
        .fulfillment
        .update_status(flow.order.id, OrderStatus::Validated, &flow.client_actor)
        .await;
    assert_matches!(result, Err(ServiceError::Forbidden(_)));
}

#[tokio::test]
async fn stock_decrement_below_threshold_alerts_vendor() {
    let env = TestEnv::new().await;
    let (vendor_user, vendor) = env.seed_vendor("vendor@shop.test").await;
    let (client_user, _) = env.seed_client("client@buy.test", dec!(100.00)).await;

    // Stock 12, alert at 10: selling 3 crosses the threshold.
    let product = env
        .seed_product_with_thresholds(vendor.id, "Honey", dec!(8.00), 12, 10, 3)
        .await;

    let mut created = env
        .services
        .orders
        .create_orders(
            &actor_for(&client_user),
            vec![CreateOrderLine {
                product_id: product.id,
                quantity: 3,
                unit_price: None,
            }],
        )
        .await
        .expect("order creates");
    let order = created.remove(0);

    env.services
        .fulfillment
        .update_status(order.id, OrderStatus::Validated, &actor_for(&vendor_user))
        .await
        .expect("validated");

    env.deliver_events().await;
    let alerts = notification::Entity::find()
        .filter(notification::Column::UserId.eq(vendor_user.id))
        .filter(notification::Column::Kind.eq(NotificationKind::StockAlert))
        .all(env.db.as_ref())
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].message.contains("Honey"));
}

#[tokio::test]
async fn admin_role_cannot_fulfill() {
    let flow = reference_order().await;
    let admin = flow
        .env
        .seed_user(UserRole::Admin, "admin@backoffice.test")
        .await;

    let result = flow
        .env
        .services
        .fulfillment
        .update_status(flow.order.id, OrderStatus::Validated, &actor_for(&admin))
        .await;
    assert_matches!(result, Err(ServiceError::Forbidden(_)));
}
