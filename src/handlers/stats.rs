use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::stats::{ChartData, ChartRange, DashboardStats},
    ApiResponse, AppState,
};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ChartQuery {
    /// One of daily, weekly, monthly, yearly.
    pub range: Option<String>,
}

/// Organization dashboard aggregates.
#[utoipa::path(
    get,
    path = "/api/v1/stats/dashboard",
    responses(
        (status = 200, description = "Dashboard computed", body = ApiResponse<DashboardStats>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "stats"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<DashboardStats>>, ServiceError> {
    let stats = state
        .services
        .stats
        .dashboard(auth_user.organization_id)
        .await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// Sales-vs-expenses series at a chosen granularity.
#[utoipa::path(
    get,
    path = "/api/v1/stats/chart",
    params(ChartQuery),
    responses(
        (status = 200, description = "Chart computed", body = ApiResponse<ChartData>),
        (status = 400, description = "Missing or invalid range", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "stats"
)]
pub async fn chart(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ChartQuery>,
) -> Result<Json<ApiResponse<ChartData>>, ServiceError> {
    let range: ChartRange = query
        .range
        .as_deref()
        .ok_or_else(|| {
            ServiceError::ValidationError(
                "range must be daily, weekly, monthly or yearly".to_string(),
            )
        })?
        .parse()
        .map_err(|_| {
            ServiceError::ValidationError(
                "range must be daily, weekly, monthly or yearly".to_string(),
            )
        })?;

    let chart = state
        .services
        .stats
        .chart(auth_user.organization_id, range)
        .await?;
    Ok(Json(ApiResponse::success(chart)))
}
