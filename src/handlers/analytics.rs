use axum::{extract::State, response::Json};

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::analytics::ItemCostRow,
    ApiResponse, AppState,
};

/// Per-item sold quantities and revenue over COMPLETED orders.
#[utoipa::path(
    get,
    path = "/api/v1/analytics/item-cost",
    responses(
        (status = 200, description = "Item cost analytics computed", body = ApiResponse<Vec<ItemCostRow>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "analytics"
)]
pub async fn item_cost(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<ItemCostRow>>>, ServiceError> {
    let rows = state
        .services
        .analytics
        .item_cost(auth_user.organization_id)
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}
