//! Notification persistence and event-to-notification dispatch.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use tracing::instrument;
use uuid::Uuid;

use crate::entities::notification::{self, Entity as NotificationEntity, NotificationKind};
use crate::entities::user::{self, UserRole};
use crate::entities::{client, vendor};
use crate::errors::ServiceError;
use crate::events::Event;

#[derive(Clone)]
pub struct NotificationService {
    db: Arc<DatabaseConnection>,
}

impl NotificationService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Persists one notification row.
    pub async fn create(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        message: String,
    ) -> Result<notification::Model, ServiceError> {
        notification::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            kind: Set(kind),
            message: Set(message),
            read: Set(false),
            created_at: Set(Utc::now()),
        }
        .insert(self.db.as_ref())
        .await
        .map_err(ServiceError::from_db)
    }

    /// Lists a user's notifications, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<notification::Model>, u64), ServiceError> {
        let paginator = NotificationEntity::find()
            .filter(notification::Column::UserId.eq(user_id))
            .order_by_desc(notification::Column::CreatedAt)
            .paginate(self.db.as_ref(), limit);

        let total = paginator.num_items().await.map_err(ServiceError::from_db)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::from_db)?;

        Ok((items, total))
    }

    /// Marks one of the caller's notifications as read.
    #[instrument(skip(self), fields(notification_id = %notification_id))]
    pub async fn mark_read(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> Result<notification::Model, ServiceError> {
        let found = NotificationEntity::find_by_id(notification_id)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Notification {} not found", notification_id))
            })?;

        if found.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "notification belongs to another user".to_string(),
            ));
        }

        let mut active: notification::ActiveModel = found.into();
        active.read = Set(true);
        active
            .update(self.db.as_ref())
            .await
            .map_err(ServiceError::from_db)
    }
}

/// Turns drained domain events into notification rows. All lookups and
/// writes happen outside the producing transaction; failures are reported to
/// the caller, which logs and swallows them.
#[derive(Clone)]
pub struct NotificationDispatcher {
    db: Arc<DatabaseConnection>,
    notifications: NotificationService,
}

impl NotificationDispatcher {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        let notifications = NotificationService::new(db.clone());
        Self { db, notifications }
    }

    pub async fn dispatch(&self, event: &Event) -> Result<(), ServiceError> {
        match event {
            Event::OrderPlaced {
                order_number,
                client_id: _,
                vendor_id,
                total_amount,
                ..
            } => {
                let message = format!(
                    "New order {} received ({} total)",
                    order_number, total_amount
                );

                if let Some(vendor) = vendor::Entity::find_by_id(*vendor_id)
                    .one(self.db.as_ref())
                    .await
                    .map_err(ServiceError::from_db)?
                {
                    self.notifications
                        .create(vendor.user_id, NotificationKind::OrderPlaced, message.clone())
                        .await?;
                }

                let admins = user::Entity::find()
                    .filter(user::Column::Role.eq(UserRole::Admin))
                    .filter(user::Column::Active.eq(true))
                    .all(self.db.as_ref())
                    .await
                    .map_err(ServiceError::from_db)?;
                for admin in admins {
                    self.notifications
                        .create(admin.id, NotificationKind::OrderPlaced, message.clone())
                        .await?;
                }
                Ok(())
            }
            Event::OrderStatusChanged {
                order_number,
                client_id,
                new_status,
                ..
            } => {
                let client = client::Entity::find_by_id(*client_id)
                    .one(self.db.as_ref())
                    .await
                    .map_err(ServiceError::from_db)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Client {} not found", client_id))
                    })?;

                self.notifications
                    .create(
                        client.user_id,
                        NotificationKind::OrderStatus,
                        format!("Order {} is now {}", order_number, new_status),
                    )
                    .await?;
                Ok(())
            }
            Event::LowStockAlert {
                product_name,
                vendor_id,
                stock_on_hand,
                critical,
                ..
            } => {
                let vendor = vendor::Entity::find_by_id(*vendor_id)
                    .one(self.db.as_ref())
                    .await
                    .map_err(ServiceError::from_db)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Vendor {} not found", vendor_id))
                    })?;

                let level = if *critical { "critically low" } else { "low" };
                self.notifications
                    .create(
                        vendor.user_id,
                        NotificationKind::StockAlert,
                        format!(
                            "Stock for '{}' is {} ({} left)",
                            product_name, level, stock_on_hand
                        ),
                    )
                    .await?;
                Ok(())
            }
        }
    }
}
