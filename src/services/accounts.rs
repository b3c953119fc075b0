//! Vendor and client account profiles.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::{client, vendor};
use crate::errors::ServiceError;

/// Resolves the vendor profile backing an authenticated vendor account.
pub async fn vendor_profile_for<C: ConnectionTrait>(
    conn: &C,
    actor: &AuthUser,
) -> Result<vendor::Model, ServiceError> {
    vendor::Entity::find()
        .filter(vendor::Column::UserId.eq(actor.id))
        .one(conn)
        .await
        .map_err(ServiceError::from_db)?
        .ok_or_else(|| ServiceError::Forbidden("no vendor profile for this account".to_string()))
}

/// Resolves the client profile backing an authenticated client account.
pub async fn client_profile_for<C: ConnectionTrait>(
    conn: &C,
    actor: &AuthUser,
) -> Result<client::Model, ServiceError> {
    client::Entity::find()
        .filter(client::Column::UserId.eq(actor.id))
        .one(conn)
        .await
        .map_err(ServiceError::from_db)?
        .ok_or_else(|| ServiceError::Forbidden("no client profile for this account".to_string()))
}

#[derive(Clone)]
pub struct AccountService {
    db: Arc<DatabaseConnection>,
}

impl AccountService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Lists vendor profiles, newest first.
    #[instrument(skip(self))]
    pub async fn list_vendors(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<vendor::Model>, u64), ServiceError> {
        let paginator = vendor::Entity::find()
            .order_by_desc(vendor::Column::CreatedAt)
            .paginate(self.db.as_ref(), limit);

        let total = paginator.num_items().await.map_err(ServiceError::from_db)?;
        let vendors = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::from_db)?;

        Ok((vendors, total))
    }

    /// Marks a vendor as approved for selling. Idempotent.
    #[instrument(skip(self), fields(vendor_id = %vendor_id))]
    pub async fn approve_vendor(&self, vendor_id: Uuid) -> Result<vendor::Model, ServiceError> {
        let vendor = vendor::Entity::find_by_id(vendor_id)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound(format!("Vendor {} not found", vendor_id)))?;

        if vendor.approved {
            return Ok(vendor);
        }

        let mut active: vendor::ActiveModel = vendor.into();
        active.approved = Set(true);
        active.updated_at = Set(Some(Utc::now()));
        let approved = active
            .update(self.db.as_ref())
            .await
            .map_err(ServiceError::from_db)?;

        info!(vendor_id = %approved.id, "vendor approved");
        Ok(approved)
    }
}
