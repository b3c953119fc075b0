//! Vendora API Library
//!
//! Multi-vendor commerce back office: clients place orders against vendor
//! catalogs, vendors fulfill them through the order state machine, admins
//! oversee vendor onboarding and dashboards.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod openapi;
pub mod services;

use std::sync::Arc;

use axum::{extract::State, response::Json, routing::get, Router};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;

use crate::auth::AuthRouterExt;
use crate::entities::user::UserRole;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
    pub auth: Arc<auth::AuthService>,
}

/// Common query parameters for list endpoints.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

/// Standard `{success, data?, message?}` response envelope.
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            (total + limit - 1) / limit
        };
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// The versioned API surface. Role gating happens here; ownership checks
/// live in the services.
pub fn api_v1_routes() -> Router<AppState> {
    let orders_client = Router::new()
        .route("/orders", axum::routing::post(handlers::orders::create_order))
        .with_role(UserRole::Client);

    let orders_vendor = Router::new()
        .route(
            "/orders/:id/status",
            axum::routing::put(handlers::orders::update_order_status),
        )
        .with_role(UserRole::Vendor);

    let orders_admin = Router::new()
        .route("/orders/all", get(handlers::orders::list_all_orders))
        .with_role(UserRole::Admin);

    let orders_shared = Router::new()
        .route("/orders/mine", get(handlers::orders::list_my_orders))
        .route("/orders/:id", get(handlers::orders::get_order))
        .route("/orders/:id/lines", get(handlers::orders::get_order_lines))
        .with_auth();

    let catalog_read = Router::new()
        .route("/products", get(handlers::products::list_products))
        .route("/products/:id", get(handlers::products::get_product))
        .route("/categories", get(handlers::products::list_categories))
        .route("/units", get(handlers::products::list_units))
        .with_auth();

    let catalog_vendor = Router::new()
        .route(
            "/products",
            axum::routing::post(handlers::products::create_product),
        )
        .route(
            "/products/:id",
            axum::routing::put(handlers::products::update_product),
        )
        .route("/products/low-stock", get(handlers::products::low_stock))
        .with_role(UserRole::Vendor);

    let catalog_admin = Router::new()
        .route(
            "/categories",
            axum::routing::post(handlers::products::create_category),
        )
        .route("/units", axum::routing::post(handlers::products::create_unit))
        .with_role(UserRole::Admin);

    let vendors_admin = Router::new()
        .route("/vendors", get(handlers::vendors::list_vendors))
        .route(
            "/vendors/:id/approve",
            axum::routing::post(handlers::vendors::approve_vendor),
        )
        .with_role(UserRole::Admin);

    let notifications = Router::new()
        .route(
            "/notifications",
            get(handlers::notifications::list_notifications),
        )
        .route(
            "/notifications/:id/read",
            axum::routing::post(handlers::notifications::mark_notification_read),
        )
        .with_auth();

    let reports_vendor = Router::new()
        .route(
            "/reports/orders-by-status",
            get(handlers::reports::orders_by_status),
        )
        .route("/reports/revenue", get(handlers::reports::revenue))
        .with_role(UserRole::Vendor);

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(orders_client)
        .merge(orders_vendor)
        .merge(orders_admin)
        .merge(orders_shared)
        .merge(catalog_read)
        .merge(catalog_vendor)
        .merge(catalog_admin)
        .merge(vendors_admin)
        .merge(notifications)
        .merge(reports_vendor)
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let status_data = json!({
        "status": "ok",
        "service": "vendora-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": { "database": db_status },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    Ok(Json(ApiResponse::success(health_data)))
}

#[cfg(test)]
mod response_tests {
    use super::*;

    #[test]
    fn success_envelope_shape() {
        let response = ApiResponse::success(42);
        assert!(response.success);
        assert_eq!(response.data, Some(42));
        assert!(response.message.is_none());

        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(body, json!({"success": true, "data": 42}));
    }

    #[test]
    fn error_envelope_shape() {
        let response = ApiResponse::<()>::error("boom".into());
        assert!(!response.success);
        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(body, json!({"success": false, "message": "boom"}));
    }

    #[test]
    fn pagination_math() {
        let page = PaginatedResponse::new(vec![1, 2, 3], 41, 1, 20);
        assert_eq!(page.total_pages, 3);
        let empty = PaginatedResponse::<i32>::new(vec![], 0, 1, 20);
        assert_eq!(empty.total_pages, 0);
    }
}
