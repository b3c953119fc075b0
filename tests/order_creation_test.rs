//! Order creation: per-vendor split, totals, balance debit, atomicity, and
//! the notification fan-out that follows from the outbox.

mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use common::{actor_for, TestEnv};
use vendora_api::entities::notification::{self, NotificationKind};
use vendora_api::entities::order::OrderStatus;
use vendora_api::entities::user::UserRole;
use vendora_api::entities::{client, order, order_line};
use vendora_api::errors::ServiceError;
use vendora_api::services::orders::CreateOrderLine;

#[tokio::test]
async fn single_vendor_order_totals_and_balance() {
    let env = TestEnv::new().await;
    let (_, vendor) = env.seed_vendor("vendor@shop.test").await;
    let (client_user, client_profile) = env.seed_client("client@buy.test", dec!(100.00)).await;

    let product_a = env
        .seed_product(vendor.id, "Product A", dec!(5.00), 10)
        .await;
    let product_b = env
        .seed_product(vendor.id, "Product B", dec!(7.50), 4)
        .await;

    let created = env
        .services
        .orders
        .create_orders(
            &actor_for(&client_user),
            vec![
                CreateOrderLine {
                    product_id: product_a.id,
                    quantity: 3,
                    unit_price: Some(dec!(5.00)),
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

    assert_eq!(created.len(), 1);
    let order = &created[0];
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.article_count, 5);
    assert_eq!(order.total_amount, dec!(29.00));
    assert_eq!(order.vendor_id, vendor.id);

    let lines = order_line::Entity::find()
        .filter(order_line::Column::OrderId.eq(order.id))
        .all(env.db.as_ref())
        .await
        .unwrap();
    assert_eq!(lines.len(), 2);

    // Balance debited by the order total.
    let refreshed = client::Entity::find_by_id(client_profile.id)
        .one(env.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.balance, dec!(71.00));

    // Stock is untouched until the vendor validates.
    assert_eq!(env.stock_of(product_a.id).await, 10);
    assert_eq!(env.stock_of(product_b.id).await, 4);
}

#[tokio::test]
async fn lines_split_into_one_order_per_vendor() {
    let env = TestEnv::new().await;
    let (_, vendor_one) = env.seed_vendor("first@shop.test").await;
    let (_, vendor_two) = env.seed_vendor("second@shop.test").await;
    let (client_user, client_profile) = env.seed_client("client@buy.test", dec!(50.00)).await;

    let from_one = env
        .seed_product(vendor_one.id, "Coffee", dec!(4.00), 20)
        .await;
    let from_two = env.seed_product(vendor_two.id, "Tea", dec!(3.00), 20).await;

    let created = env
        .services
        .orders
        .create_orders(
            &actor_for(&client_user),
            vec![
                CreateOrderLine {
                    product_id: from_one.id,
                    quantity: 2,
                    unit_price: None,
                },
                CreateOrderLine {
                    product_id: from_two.id,
                    quantity: 3,
                    unit_price: None,
                },
            ],
        )
        .await
        .expect("orders create");

    assert_eq!(created.len(), 2);
    let vendors: Vec<Uuid> = created.iter().map(|o| o.vendor_id).collect();
    assert!(vendors.contains(&vendor_one.id));
    assert!(vendors.contains(&vendor_two.id));

    for order in &created {
        let lines = order_line::Entity::find()
            .filter(order_line::Column::OrderId.eq(order.id))
            .all(env.db.as_ref())
            .await
            .unwrap();
        assert_eq!(lines.len(), 1, "each sub-order carries only its own lines");
    }

    // One combined debit: 2 * 4.00 + 3 * 3.00 = 17.00
    let refreshed = client::Entity::find_by_id(client_profile.id)
        .one(env.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.balance, dec!(33.00));
}

#[tokio::test]
async fn empty_line_list_is_rejected() {
    let env = TestEnv::new().await;
    let (client_user, _) = env.seed_client("client@buy.test", dec!(10.00)).await;

    let result = env
        .services
        .orders
        .create_orders(&actor_for(&client_user), vec![])
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn unknown_product_rolls_back_every_sub_order() {
    let env = TestEnv::new().await;
    let (_, vendor) = env.seed_vendor("vendor@shop.test").await;
    let (client_user, client_profile) = env.seed_client("client@buy.test", dec!(40.00)).await;
    let product = env.seed_product(vendor.id, "Sugar", dec!(2.00), 15).await;

    let result = env
        .services
        .orders
        .create_orders(
            &actor_for(&client_user),
            vec![
                CreateOrderLine {
                    product_id: product.id,
                    quantity: 1,
                    unit_price: None,
                },
                CreateOrderLine {
                    product_id: Uuid::new_v4(),
                    quantity: 1,
                    unit_price: None,
                },
            ],
        )
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));

    // Nothing persisted, balance untouched.
    let orders = order::Entity::find().all(env.db.as_ref()).await.unwrap();
    assert!(orders.is_empty());
    let refreshed = client::Entity::find_by_id(client_profile.id)
        .one(env.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.balance, dec!(40.00));
}

#[tokio::test]
async fn price_assertion_must_match_catalog() {
    let env = TestEnv::new().await;
    let (_, vendor) = env.seed_vendor("vendor@shop.test").await;
    let (client_user, _) = env.seed_client("client@buy.test", dec!(40.00)).await;
    let product = env.seed_product(vendor.id, "Flour", dec!(2.50), 15).await;

    let result = env
        .services
        .orders
        .create_orders(
            &actor_for(&client_user),
            vec![CreateOrderLine {
                product_id: product.id,
                quantity: 1,
                unit_price: Some(dec!(1.99)),
            }],
        )
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn zero_quantity_is_rejected() {
    let env = TestEnv::new().await;
    let (_, vendor) = env.seed_vendor("vendor@shop.test").await;
    let (client_user, _) = env.seed_client("client@buy.test", dec!(40.00)).await;
    let product = env.seed_product(vendor.id, "Rice", dec!(3.00), 15).await;

    let result = env
        .services
        .orders
        .create_orders(
            &actor_for(&client_user),
            vec![CreateOrderLine {
                product_id: product.id,
                quantity: 0,
                unit_price: None,
            }],
        )
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn vendors_cannot_place_orders() {
    let env = TestEnv::new().await;
    let (vendor_user, vendor) = env.seed_vendor("vendor@shop.test").await;
    let product = env.seed_product(vendor.id, "Salt", dec!(1.00), 15).await;

    let result = env
        .services
        .orders
        .create_orders(
            &actor_for(&vendor_user),
            vec![CreateOrderLine {
                product_id: product.id,
                quantity: 1,
                unit_price: None,
            }],
        )
        .await;
    assert_matches!(result, Err(ServiceError::Forbidden(_)));
}

#[tokio::test]
async fn order_placed_notifies_vendor_and_admins() {
    let env = TestEnv::new().await;
    let admin = env.seed_user(UserRole::Admin, "admin@backoffice.test").await;
    let (vendor_user, vendor) = env.seed_vendor("vendor@shop.test").await;
    let (client_user, _) = env.seed_client("client@buy.test", dec!(30.00)).await;
    let product = env.seed_product(vendor.id, "Beans", dec!(6.00), 9).await;

    env.services
        .orders
        .create_orders(
            &actor_for(&client_user),
            vec![CreateOrderLine {
                product_id: product.id,
                quantity: 1,
                unit_price: None,
            }],
        )
        .await
        .expect("order creates");

    let drained = env.deliver_events().await;
    assert_eq!(drained, 1, "one OrderPlaced event per vendor sub-order");

    for recipient in [vendor_user.id, admin.id] {
        let received = notification::Entity::find()
            .filter(notification::Column::UserId.eq(recipient))
            .all(env.db.as_ref())
            .await
            .unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].kind, NotificationKind::OrderPlaced);
        assert!(!received[0].read);
    }
}
