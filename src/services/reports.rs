//! Read/reporting layer: query composition for dashboards, no core logic.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::entities::order::{self, OrderStatus};
use crate::entities::sale;
use crate::errors::ServiceError;
use crate::services::accounts::vendor_profile_for;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RevenueSummary {
    pub sales_count: u64,
    pub total_revenue: Decimal,
}

#[derive(Clone)]
pub struct ReportService {
    db: Arc<DatabaseConnection>,
}

impl ReportService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Order counts per status for the acting vendor.
    #[instrument(skip(self, actor))]
    pub async fn orders_by_status(
        &self,
        actor: &AuthUser,
    ) -> Result<Vec<StatusCount>, ServiceError> {
        let vendor = vendor_profile_for(self.db.as_ref(), actor).await?;

        let orders = order::Entity::find()
            .filter(order::Column::VendorId.eq(vendor.id))
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::from_db)?;

        let mut counts: BTreeMap<String, (OrderStatus, u64)> = BTreeMap::new();
        for order in orders {
            let entry = counts
                .entry(order.status.to_string())
                .or_insert((order.status, 0));
            entry.1 += 1;
        }

        Ok(counts
            .into_values()
            .map(|(status, count)| StatusCount { status, count })
            .collect())
    }

    /// Completed-sale revenue for the acting vendor.
    #[instrument(skip(self, actor))]
    pub async fn revenue(&self, actor: &AuthUser) -> Result<RevenueSummary, ServiceError> {
        let vendor = vendor_profile_for(self.db.as_ref(), actor).await?;

        let sales = sale::Entity::find()
            .filter(sale::Column::VendorId.eq(vendor.id))
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::from_db)?;

        let total_revenue = sales.iter().map(|s| s.total_amount).sum();
        Ok(RevenueSummary {
            sales_count: sales.len() as u64,
            total_revenue,
        })
    }
}
