//! Shared fixture for the integration suites: an in-memory SQLite database
//! with the real migrations applied, plus seed helpers.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectOptions, Database, DatabaseConnection, EntityTrait,
};
use sea_orm_migration::MigratorTrait;
use tokio::sync::mpsc;
use uuid::Uuid;

use vendora_api::auth::AuthUser;
use vendora_api::entities::user::UserRole;
use vendora_api::entities::{category, client, product, unit, user, vendor};
use vendora_api::events::{outbox, EventSender};
use vendora_api::handlers::AppServices;
use vendora_api::services::notifications::NotificationDispatcher;

pub struct TestEnv {
    pub db: Arc<DatabaseConnection>,
    pub services: AppServices,
    pub category: category::Model,
    pub unit: unit::Model,
}

impl TestEnv {
    pub async fn new() -> Self {
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1).sqlx_logging(false);
        let db = Database::connect(options).await.expect("sqlite connects");
        migrations::Migrator::up(&db, None)
            .await
            .expect("migrations apply");

        let db = Arc::new(db);
        let services = AppServices::new(db.clone());
        let category = seed_category(&db, "Groceries").await;
        let unit = seed_unit(&db, "Piece", "pc").await;

        Self {
            db,
            services,
            category,
            unit,
        }
    }

    pub async fn seed_user(&self, role: UserRole, email: &str) -> user::Model {
        user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            password_hash: Set("unused-in-these-tests".to_string()),
            full_name: Set(format!("{} user", role)),
            role: Set(role),
            active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(self.db.as_ref())
        .await
        .expect("user inserts")
    }

    pub async fn seed_vendor(&self, email: &str) -> (user::Model, vendor::Model) {
        let user = self.seed_user(UserRole::Vendor, email).await;
        let vendor = vendor::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            shop_name: Set(format!("{} shop", email)),
            approved: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(self.db.as_ref())
        .await
        .expect("vendor inserts");
        (user, vendor)
    }

    pub async fn seed_client(&self, email: &str, balance: Decimal) -> (user::Model, client::Model) {
        let user = self.seed_user(UserRole::Client, email).await;
        let client = client::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            address: Set("12 Market Street, Springfield".to_string()),
            balance: Set(balance),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(self.db.as_ref())
        .await
        .expect("client inserts");
        (user, client)
    }

    pub async fn seed_product(
        &self,
        vendor_id: Uuid,
        name: &str,
        price: Decimal,
        stock: i32,
    ) -> product::Model {
        self.seed_product_with_thresholds(vendor_id, name, price, stock, 10, 3)
            .await
    }

    pub async fn seed_product_with_thresholds(
        &self,
        vendor_id: Uuid,
        name: &str,
        price: Decimal,
        stock: i32,
        alert: i32,
        critical: i32,
    ) -> product::Model {
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            vendor_id: Set(vendor_id),
            category_id: Set(self.category.id),
            unit_id: Set(self.unit.id),
            name: Set(name.to_string()),
            description: Set(None),
            price: Set(price),
            stock_on_hand: Set(stock),
            alert_threshold: Set(alert),
            critical_threshold: Set(critical),
            active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(self.db.as_ref())
        .await
        .expect("product inserts")
    }

    pub async fn stock_of(&self, product_id: Uuid) -> i32 {
        product::Entity::find_by_id(product_id)
            .one(self.db.as_ref())
            .await
            .expect("product query")
            .expect("product exists")
            .stock_on_hand
    }

    /// Drains the outbox once and feeds every drained event through the
    /// notification dispatcher, the way the background worker and event
    /// consumer do in production.
    pub async fn deliver_events(&self) -> usize {
        let (tx, mut rx) = mpsc::channel(64);
        let sender = EventSender::new(tx);
        let drained = outbox::drain_once(self.db.as_ref(), &sender, 64)
            .await
            .expect("outbox drains");

        let dispatcher = NotificationDispatcher::new(self.db.clone());
        while let Ok(event) = rx.try_recv() {
            dispatcher.dispatch(&event).await.expect("event dispatches");
        }
        drained
    }
}

pub fn actor_for(user: &user::Model) -> AuthUser {
    AuthUser {
        id: user.id,
        email: user.email.clone(),
        role: user.role,
        token_id: Uuid::new_v4().to_string(),
    }
}

async fn seed_category(db: &DatabaseConnection, name: &str) -> category::Model {
    category::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("category inserts")
}

async fn seed_unit(db: &DatabaseConnection, name: &str, abbreviation: &str) -> unit::Model {
    unit::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        abbreviation: Set(abbreviation.to_string()),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("unit inserts")
}
