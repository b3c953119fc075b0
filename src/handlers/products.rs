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
use crate::entities::{category, unit};
use crate::errors::ServiceError;
use crate::services::products::{
    CreateProductRequest, LowStockItem, ProductFilter, ProductResponse, UpdateProductRequest,
};
use crate::{ApiResponse, AppState, PaginatedResponse};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductsQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub vendor: Option<Uuid>,
    pub category: Option<Uuid>,
    #[serde(default)]
    pub include_inactive: bool,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateUnitRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 10))]
    pub abbreviation: String,
}

/// List catalog products with optional vendor/category filters.
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default 20)"),
        ("vendor" = Option<Uuid>, Query, description = "Filter by vendor"),
        ("category" = Option<Uuid>, Query, description = "Filter by category"),
    ),
    responses(
        (status = 200, description = "Products retrieved", body = ApiResponse<PaginatedResponse<ProductResponse>>),
    ),
    security(("Bearer" = []))
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductsQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<ProductResponse>>>, ServiceError> {
    let filter = ProductFilter {
        vendor_id: query.vendor,
        category_id: query.category,
        active_only: !query.include_inactive,
    };
    let (products, total) = state
        .services
        .products
        .list(filter, query.page, query.limit)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        products,
        total,
        query.page,
        query.limit,
    ))))
}

/// Get one product.
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product retrieved", body = ApiResponse<ProductResponse>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProductResponse>>, ServiceError> {
    let product = state.services.products.get(id).await?;
    Ok(Json(ApiResponse::success(product)))
}

/// Create a product in the acting vendor's catalog.
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<ProductResponse>),
        (status = 403, description = "Vendor role required", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_product(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductResponse>>), ServiceError> {
    let created = state.services.products.create(&auth_user, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

/// Update a product owned by the acting vendor.
#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<ProductResponse>),
        (status = 403, description = "Product belongs to another vendor", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<UpdateProductRequest>,
) -> Result<Json<ApiResponse<ProductResponse>>, ServiceError> {
    let updated = state
        .services
        .products
        .update(&auth_user, id, request)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

/// List the acting vendor's products at or below their alert threshold.
#[utoipa::path(
    get,
    path = "/api/v1/products/low-stock",
    responses(
        (status = 200, description = "Low stock products", body = ApiResponse<Vec<LowStockItem>>),
        (status = 403, description = "Vendor role required", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn low_stock(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<LowStockItem>>>, ServiceError> {
    let items = state.services.products.low_stock(&auth_user).await?;
    Ok(Json(ApiResponse::success(items)))
}

/// List categories.
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses((status = 200, description = "Categories retrieved", body = ApiResponse<Vec<category::Model>>)),
    security(("Bearer" = []))
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<category::Model>>>, ServiceError> {
    let categories = state.services.products.list_categories().await?;
    Ok(Json(ApiResponse::success(categories)))
}

/// Create a category (admin).
#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = ApiResponse<category::Model>),
        (status = 409, description = "Duplicate name", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<category::Model>>), ServiceError> {
    request.validate()?;
    let created = state.services.products.create_category(request.name).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

/// List units of measure.
#[utoipa::path(
    get,
    path = "/api/v1/units",
    responses((status = 200, description = "Units retrieved", body = ApiResponse<Vec<unit::Model>>)),
    security(("Bearer" = []))
)]
pub async fn list_units(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<unit::Model>>>, ServiceError> {
    let units = state.services.products.list_units().await?;
    Ok(Json(ApiResponse::success(units)))
}

/// Create a unit of measure (admin).
#[utoipa::path(
    post,
    path = "/api/v1/units",
    request_body = CreateUnitRequest,
    responses(
        (status = 201, description = "Unit created", body = ApiResponse<unit::Model>),
        (status = 409, description = "Duplicate name", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_unit(
    State(state): State<AppState>,
    Json(request): Json<CreateUnitRequest>,
) -> Result<(StatusCode, Json<ApiResponse<unit::Model>>), ServiceError> {
    request.validate()?;
    let created = state
        .services
        .products
        .create_unit(request.name, request.abbreviation)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}
