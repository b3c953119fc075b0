use axum::{extract::State, response::Json};

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::services::reports::{RevenueSummary, StatusCount};
use crate::{ApiResponse, AppState};

/// Order counts per status for the acting vendor's dashboard.
#[utoipa::path(
    get,
    path = "/api/v1/reports/orders-by-status",
    responses(
        (status = 200, description = "Counts retrieved", body = ApiResponse<Vec<StatusCount>>),
        (status = 403, description = "Vendor role required", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn orders_by_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<StatusCount>>>, ServiceError> {
    let counts = state.services.reports.orders_by_status(&auth_user).await?;
    Ok(Json(ApiResponse::success(counts)))
}

/// Completed-sale revenue for the acting vendor.
#[utoipa::path(
    get,
    path = "/api/v1/reports/revenue",
    responses(
        (status = 200, description = "Revenue retrieved", body = ApiResponse<RevenueSummary>),
        (status = 403, description = "Vendor role required", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn revenue(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<RevenueSummary>>, ServiceError> {
    let summary = state.services.reports.revenue(&auth_user).await?;
    Ok(Json(ApiResponse::success(summary)))
}
