//! Catalog: products, categories, units.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::entities::{category, product, unit};
use crate::errors::ServiceError;
use crate::services::accounts::vendor_profile_for;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200, message = "Product name must be 1-200 characters"))]
    pub name: String,
    pub description: Option<String>,
    pub category_id: Uuid,
    pub unit_id: Uuid,
    pub price: Decimal,
    #[validate(range(min = 0))]
    pub stock_on_hand: i32,
    #[validate(range(min = 0))]
    pub alert_threshold: i32,
    #[validate(range(min = 0))]
    pub critical_threshold: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub alert_threshold: Option<i32>,
    pub critical_threshold: Option<i32>,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub category_id: Uuid,
    pub unit_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock_on_hand: i32,
    pub alert_threshold: i32,
    pub critical_threshold: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LowStockItem {
    pub id: Uuid,
    pub name: String,
    pub stock_on_hand: i32,
    pub alert_threshold: i32,
    pub critical: bool,
}

#[derive(Debug, Default)]
pub struct ProductFilter {
    pub vendor_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub active_only: bool,
}

#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates a product in the acting vendor's catalog.
    #[instrument(skip(self, actor, request), fields(user_id = %actor.id))]
    pub async fn create(
        &self,
        actor: &AuthUser,
        request: CreateProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        request.validate()?;
        let vendor = vendor_profile_for(self.db.as_ref(), actor).await?;

        let now = Utc::now();
        let created = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            vendor_id: Set(vendor.id),
            category_id: Set(request.category_id),
            unit_id: Set(request.unit_id),
            name: Set(request.name),
            description: Set(request.description),
            price: Set(request.price),
            stock_on_hand: Set(request.stock_on_hand),
            alert_threshold: Set(request.alert_threshold),
            critical_threshold: Set(request.critical_threshold),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(self.db.as_ref())
        .await
        .map_err(ServiceError::from_db)?;

        info!(product_id = %created.id, vendor_id = %vendor.id, "product created");
        Ok(model_to_response(created))
    }

    /// Updates a product owned by the acting vendor.
    #[instrument(skip(self, actor, request), fields(product_id = %product_id))]
    pub async fn update(
        &self,
        actor: &AuthUser,
        product_id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        request.validate()?;
        let vendor = vendor_profile_for(self.db.as_ref(), actor).await?;

        let found = product::Entity::find_by_id(product_id)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        if found.vendor_id != vendor.id {
            return Err(ServiceError::Forbidden(
                "product belongs to another vendor".to_string(),
            ));
        }

        let mut active: product::ActiveModel = found.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(alert) = request.alert_threshold {
            active.alert_threshold = Set(alert);
        }
        if let Some(critical) = request.critical_threshold {
            active.critical_threshold = Set(critical);
        }
        if let Some(is_active) = request.active {
            active.active = Set(is_active);
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active
            .update(self.db.as_ref())
            .await
            .map_err(ServiceError::from_db)?;
        Ok(model_to_response(updated))
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get(&self, product_id: Uuid) -> Result<ProductResponse, ServiceError> {
        let found = product::Entity::find_by_id(product_id)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;
        Ok(model_to_response(found))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: ProductFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<ProductResponse>, u64), ServiceError> {
        let mut condition = Condition::all();
        if let Some(vendor_id) = filter.vendor_id {
            condition = condition.add(product::Column::VendorId.eq(vendor_id));
        }
        if let Some(category_id) = filter.category_id {
            condition = condition.add(product::Column::CategoryId.eq(category_id));
        }
        if filter.active_only {
            condition = condition.add(product::Column::Active.eq(true));
        }

        let paginator = product::Entity::find()
            .filter(condition)
            .order_by_asc(product::Column::Name)
            .paginate(self.db.as_ref(), limit);

        let total = paginator.num_items().await.map_err(ServiceError::from_db)?;
        let products = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::from_db)?;

        Ok((products.into_iter().map(model_to_response).collect(), total))
    }

    /// Lists the acting vendor's products at or below their alert threshold.
    #[instrument(skip(self, actor))]
    pub async fn low_stock(&self, actor: &AuthUser) -> Result<Vec<LowStockItem>, ServiceError> {
        let vendor = vendor_profile_for(self.db.as_ref(), actor).await?;

        let products = product::Entity::find()
            .filter(product::Column::VendorId.eq(vendor.id))
            .filter(product::Column::Active.eq(true))
            .order_by_asc(product::Column::StockOnHand)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::from_db)?;

        Ok(products
            .into_iter()
            .filter(|p| p.is_low_stock())
            .map(|p| LowStockItem {
                id: p.id,
                name: p.name.clone(),
                stock_on_hand: p.stock_on_hand,
                alert_threshold: p.alert_threshold,
                critical: p.is_critical_stock(),
            })
            .collect())
    }

    /// Creates a category. Duplicate names surface as 409.
    #[instrument(skip(self))]
    pub async fn create_category(&self, name: String) -> Result<category::Model, ServiceError> {
        category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            created_at: Set(Utc::now()),
        }
        .insert(self.db.as_ref())
        .await
        .map_err(ServiceError::from_db)
    }

    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        category::Entity::find()
            .order_by_asc(category::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::from_db)
    }

    /// Creates a unit of measure. Duplicate names surface as 409.
    #[instrument(skip(self))]
    pub async fn create_unit(
        &self,
        name: String,
        abbreviation: String,
    ) -> Result<unit::Model, ServiceError> {
        unit::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            abbreviation: Set(abbreviation),
            created_at: Set(Utc::now()),
        }
        .insert(self.db.as_ref())
        .await
        .map_err(ServiceError::from_db)
    }

    #[instrument(skip(self))]
    pub async fn list_units(&self) -> Result<Vec<unit::Model>, ServiceError> {
        unit::Entity::find()
            .order_by_asc(unit::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::from_db)
    }
}

fn model_to_response(model: product::Model) -> ProductResponse {
    ProductResponse {
        id: model.id,
        vendor_id: model.vendor_id,
        category_id: model.category_id,
        unit_id: model.unit_id,
        name: model.name,
        description: model.description,
        price: model.price,
        stock_on_hand: model.stock_on_hand,
        alert_threshold: model.alert_threshold,
        critical_threshold: model.critical_threshold,
        active: model.active,
        created_at: model.created_at,
    }
}
