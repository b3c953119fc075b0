//! Outbox drain semantics: delivered rows are marked, failed dispatches are
//! retried later with backoff, and rows stay invisible until due.

mod common;

use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use tokio::sync::mpsc;

use common::{actor_for, TestEnv};
use vendora_api::entities::outbox_event::{self, OutboxStatus};
use vendora_api::events::{outbox, EventSender};
use vendora_api::services::orders::CreateOrderLine;

async fn seed_one_outbox_row(env: &TestEnv) {
    let (_, vendor) = env.seed_vendor("vendor@shop.test").await;
    let (client_user, _) = env.seed_client("client@buy.test", dec!(30.00)).await;
    let product = env.seed_product(vendor.id, "Lentils", dec!(2.00), 40).await;

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
}

#[tokio::test]
async fn drained_rows_are_marked_delivered() {
    let env = TestEnv::new().await;
    seed_one_outbox_row(&env).await;

    let (tx, mut rx) = mpsc::channel(8);
    let sender = EventSender::new(tx);
    let drained = outbox::drain_once(env.db.as_ref(), &sender, 10)
        .await
        .expect("drain succeeds");
    assert_eq!(drained, 1);
    assert!(rx.try_recv().is_ok(), "event reached the channel");

    let rows = outbox_event::Entity::find()
        .all(env.db.as_ref())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, OutboxStatus::Delivered);
    assert_eq!(rows[0].attempts, 1);
    assert!(rows[0].processed_at.is_some());

    // Nothing left to claim.
    let drained_again = outbox::drain_once(env.db.as_ref(), &sender, 10)
        .await
        .expect("drain succeeds");
    assert_eq!(drained_again, 0);
}

#[tokio::test]
async fn failed_dispatch_is_scheduled_for_retry() {
    let env = TestEnv::new().await;
    seed_one_outbox_row(&env).await;

    // Receiver dropped: every send fails.
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let sender = EventSender::new(tx);

    let drained = outbox::drain_once(env.db.as_ref(), &sender, 10)
        .await
        .expect("drain succeeds even when dispatch fails");
    assert_eq!(drained, 1);

    let rows = outbox_event::Entity::find()
        .all(env.db.as_ref())
        .await
        .unwrap();
    assert_eq!(rows[0].status, OutboxStatus::Pending);
    assert_eq!(rows[0].attempts, 1);
    assert!(rows[0].available_at > chrono::Utc::now());
    assert_eq!(rows[0].error_message.as_deref(), Some("dispatch failed"));

    // Backed-off row is not due yet, so a second drain claims nothing.
    let drained_again = outbox::drain_once(env.db.as_ref(), &sender, 10)
        .await
        .expect("drain succeeds");
    assert_eq!(drained_again, 0);
}
