use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use uuid::Uuid;

use crate::entities::vendor;
use crate::errors::ServiceError;
use crate::{ApiResponse, AppState, ListQuery, PaginatedResponse};

/// List vendor profiles for onboarding review. Admin only.
#[utoipa::path(
    get,
    path = "/api/v1/vendors",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default 20)"),
    ),
    responses(
        (status = 200, description = "Vendors retrieved", body = ApiResponse<PaginatedResponse<vendor::Model>>),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_vendors(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<vendor::Model>>>, ServiceError> {
    let (vendors, total) = state
        .services
        .accounts
        .list_vendors(query.page, query.limit)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        vendors,
        total,
        query.page,
        query.limit,
    ))))
}

/// Approve a vendor for selling. Admin only, idempotent.
#[utoipa::path(
    post,
    path = "/api/v1/vendors/{id}/approve",
    params(("id" = Uuid, Path, description = "Vendor ID")),
    responses(
        (status = 200, description = "Vendor approved", body = ApiResponse<vendor::Model>),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Vendor not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn approve_vendor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<vendor::Model>>, ServiceError> {
    let vendor = state.services.accounts.approve_vendor(id).await?;
    Ok(Json(ApiResponse::success(vendor)))
}
