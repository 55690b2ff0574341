use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    entities::item,
    errors::ServiceError,
    services::analytics::AverageCostPriceResponse,
    services::items::{CreateItemRequest, UpdateItemRequest},
    ApiResponse, AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ItemResponse {
    pub id: Uuid,
    pub name: String,
    pub selling_price: Decimal,
    pub inventory_qty: i32,
    pub organization_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<item::Model> for ItemResponse {
    fn from(model: item::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            selling_price: model.selling_price,
            inventory_qty: model.inventory_qty,
            organization_id: model.organization_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Manual stock movement request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StockAdjustmentRequest {
    #[validate(range(min = 1, message = "qty must be positive"))]
    pub qty: i32,
}

/// List the organization's items.
#[utoipa::path(
    get,
    path = "/api/v1/items",
    responses(
        (status = 200, description = "Items retrieved", body = ApiResponse<Vec<ItemResponse>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "items"
)]
pub async fn list_items(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<ItemResponse>>>, ServiceError> {
    let items = state.services.items.list(auth_user.organization_id).await?;
    Ok(Json(ApiResponse::success(
        items.into_iter().map(ItemResponse::from).collect(),
    )))
}

/// Create an item.
#[utoipa::path(
    post,
    path = "/api/v1/items",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created", body = ApiResponse<ItemResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ItemResponse>>), ServiceError> {
    let created = state
        .services
        .items
        .create(auth_user.organization_id, request)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(created.into())),
    ))
}

/// Average cost price per unit including allocated overhead.
///
/// Declared before `/{id}` routes so the literal segment wins.
#[utoipa::path(
    get,
    path = "/api/v1/items/average-cost-price",
    responses(
        (status = 200, description = "Cost analytics computed", body = ApiResponse<AverageCostPriceResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "items"
)]
pub async fn average_cost_price(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<AverageCostPriceResponse>>, ServiceError> {
    let response = state
        .services
        .analytics
        .average_cost_price(auth_user.organization_id)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Fetch one item.
#[utoipa::path(
    get,
    path = "/api/v1/items/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item retrieved", body = ApiResponse<ItemResponse>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ItemResponse>>, ServiceError> {
    let found = state
        .services
        .items
        .get(auth_user.organization_id, id)
        .await?;
    Ok(Json(ApiResponse::success(found.into())))
}

/// Update an item's name, price or restated stock count.
#[utoipa::path(
    put,
    path = "/api/v1/items/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Item updated", body = ApiResponse<ItemResponse>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "items"
)]
pub async fn update_item(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<ApiResponse<ItemResponse>>, ServiceError> {
    let updated = state
        .services
        .items
        .update(auth_user.organization_id, id, request)
        .await?;
    Ok(Json(ApiResponse::success(updated.into())))
}

/// Delete an item.
#[utoipa::path(
    delete,
    path = "/api/v1/items/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "items"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ServiceError> {
    state
        .services
        .items
        .delete(auth_user.organization_id, id)
        .await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": id }),
    )))
}

/// Add stock from a delivery or count correction.
#[utoipa::path(
    post,
    path = "/api/v1/items/{id}/add-stock",
    params(("id" = Uuid, Path, description = "Item id")),
    request_body = StockAdjustmentRequest,
    responses(
        (status = 200, description = "Stock added", body = ApiResponse<ItemResponse>),
        (status = 400, description = "qty must be positive", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "items"
)]
pub async fn add_stock(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<StockAdjustmentRequest>,
) -> Result<Json<ApiResponse<ItemResponse>>, ServiceError> {
    request
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let updated = state
        .services
        .items
        .adjust_stock(auth_user.organization_id, id, request.qty, "manual stock-in")
        .await?;
    Ok(Json(ApiResponse::success(updated.into())))
}

/// Remove stock for wastage or shrinkage; cannot take stock negative.
#[utoipa::path(
    post,
    path = "/api/v1/items/{id}/reduce-stock",
    params(("id" = Uuid, Path, description = "Item id")),
    request_body = StockAdjustmentRequest,
    responses(
        (status = 200, description = "Stock reduced", body = ApiResponse<ItemResponse>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Not enough stock on hand", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "items"
)]
pub async fn reduce_stock(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<StockAdjustmentRequest>,
) -> Result<Json<ApiResponse<ItemResponse>>, ServiceError> {
    request
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let updated = state
        .services
        .items
        .adjust_stock(
            auth_user.organization_id,
            id,
            -request.qty,
            "manual stock-out",
        )
        .await?;
    Ok(Json(ApiResponse::success(updated.into())))
}
