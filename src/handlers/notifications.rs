use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::notification;
use crate::errors::ServiceError;
use crate::{ApiResponse, AppState, ListQuery, PaginatedResponse};

/// List the caller's notifications, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default 20)"),
    ),
    responses(
        (status = 200, description = "Notifications retrieved", body = ApiResponse<PaginatedResponse<notification::Model>>),
        (status = 401, description = "Unauthenticated", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<PaginatedResponse<notification::Model>>>, ServiceError> {
    let (items, total) = state
        .services
        .notifications
        .list_for_user(auth_user.id, query.page, query.limit)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items,
        total,
        query.page,
        query.limit,
    ))))
}

/// Mark one of the caller's notifications as read.
#[utoipa::path(
    post,
    path = "/api/v1/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked read", body = ApiResponse<notification::Model>),
        (status = 403, description = "Belongs to another user", body = crate::errors::ErrorResponse),
        (status = 404, description = "Notification not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<notification::Model>>, ServiceError> {
    let updated = state
        .services
        .notifications
        .mark_read(auth_user.id, id)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}
