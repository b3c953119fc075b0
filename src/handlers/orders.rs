use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::entities::order::OrderStatus;
use crate::errors::ServiceError;
use crate::services::orders::{CreateOrderLine, OrderLineResponse, OrderResponse};
use crate::{ApiResponse, AppState, ListQuery, PaginatedResponse};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "At least one line is required"))]
    pub lines: Vec<CreateOrderLine>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AllOrdersQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub status: Option<OrderStatus>,
    pub category: Option<Uuid>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

/// Create orders from the authenticated client's line list; lines spanning
/// several vendors produce one order per vendor.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Orders created", body = ApiResponse<Vec<OrderResponse>>),
        (status = 400, description = "Invalid lines", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthenticated", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not a client account", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<OrderResponse>>>), ServiceError> {
    request.validate()?;
    let created = state
        .services
        .orders
        .create_orders(&auth_user, request.lines)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

/// List the caller's own orders (orders placed, for clients; orders
/// received, for vendors).
#[utoipa::path(
    get,
    path = "/api/v1/orders/mine",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default 20)"),
    ),
    responses(
        (status = 200, description = "Orders retrieved", body = ApiResponse<PaginatedResponse<OrderResponse>>),
        (status = 401, description = "Unauthenticated", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_my_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<PaginatedResponse<OrderResponse>>>, ServiceError> {
    let page = state
        .services
        .orders
        .list_mine(&auth_user, query.page, query.limit)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        page.orders,
        page.total,
        query.page,
        query.limit,
    ))))
}

/// List every order with optional status / category filters. Admin only.
#[utoipa::path(
    get,
    path = "/api/v1/orders/all",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default 20)"),
        ("status" = Option<String>, Query, description = "Filter by order status"),
        ("category" = Option<Uuid>, Query, description = "Filter by product category"),
    ),
    responses(
        (status = 200, description = "Orders retrieved", body = ApiResponse<PaginatedResponse<OrderResponse>>),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    Query(query): Query<AllOrdersQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<OrderResponse>>>, ServiceError> {
    let page = state
        .services
        .orders
        .list_all(query.status, query.category, query.page, query.limit)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        page.orders,
        page.total,
        query.page,
        query.limit,
    ))))
}

/// Get one order. Visible to its client, its vendor, and admins.
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order retrieved", body = ApiResponse<OrderResponse>),
        (status = 403, description = "Order belongs to someone else", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state.services.orders.get_order(&auth_user, id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Get the lines of one order.
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/lines",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Lines retrieved", body = ApiResponse<Vec<OrderLineResponse>>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_order_lines(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<OrderLineResponse>>>, ServiceError> {
    let lines = state
        .services
        .orders
        .get_order_lines(&auth_user, id)
        .await?;
    Ok(Json(ApiResponse::success(lines)))
}

/// Apply a status transition as the owning vendor. Stock movement, billing
/// records and notifications follow from the target status.
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Invalid transition or insufficient stock", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the owning vendor", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let updated = state
        .services
        .fulfillment
        .update_status(id, request.status, &auth_user)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}
