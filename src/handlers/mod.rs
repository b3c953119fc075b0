pub mod notifications;
pub mod orders;
pub mod products;
pub mod reports;
pub mod vendors;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer used by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<crate::services::orders::OrderService>,
    pub fulfillment: Arc<crate::services::fulfillment::FulfillmentService>,
    pub products: Arc<crate::services::products::ProductService>,
    pub accounts: Arc<crate::services::accounts::AccountService>,
    pub notifications: Arc<crate::services::notifications::NotificationService>,
    pub reports: Arc<crate::services::reports::ReportService>,
}

impl AppServices {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            orders: Arc::new(crate::services::orders::OrderService::new(db.clone())),
            fulfillment: Arc::new(crate::services::fulfillment::FulfillmentService::new(
                db.clone(),
            )),
            products: Arc::new(crate::services::products::ProductService::new(db.clone())),
            accounts: Arc::new(crate::services::accounts::AccountService::new(db.clone())),
            notifications: Arc::new(crate::services::notifications::NotificationService::new(
                db.clone(),
            )),
            reports: Arc::new(crate::services::reports::ReportService::new(db)),
        }
    }
}
