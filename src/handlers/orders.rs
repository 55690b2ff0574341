use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::{order, order_item},
    errors::ServiceError,
    models::OrderStatus,
    services::orders::{CreateOrderRequest, UpdateOrderLinesRequest},
    ApiResponse, AppState, PaginatedResponse,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderLineResponse {
    pub id: Uuid,
    pub item_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderLineResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Optional status filter (PENDING/COMPLETED/CANCELLED).
    pub status: Option<String>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

fn map_order(
    model: order::Model,
    lines: Vec<order_item::Model>,
) -> Result<OrderResponse, ServiceError> {
    let status: OrderStatus = model
        .status
        .parse()
        .map_err(|_| ServiceError::InternalError(format!("corrupt order status: {}", model.status)))?;

    Ok(OrderResponse {
        id: model.id,
        order_number: model.order_number,
        status,
        total_amount: model.total_amount,
        user_id: model.user_id,
        organization_id: model.organization_id,
        created_at: model.created_at,
        updated_at: model.updated_at,
        items: lines
            .into_iter()
            .map(|line| OrderLineResponse {
                id: line.id,
                item_id: line.item_id,
                quantity: line.quantity,
                price: line.price,
            })
            .collect(),
    })
}

fn parse_status_param(raw: &str) -> Result<OrderStatus, ServiceError> {
    raw.to_ascii_uppercase().parse().map_err(|_| {
        ServiceError::ValidationError(format!("Unknown order status: {raw}"))
    })
}

/// List orders newest-first with pagination and an optional status filter.
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Orders retrieved", body = ApiResponse<PaginatedResponse<OrderResponse>>),
        (status = 400, description = "Invalid status filter", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<OrderResponse>>>, ServiceError> {
    let status = query
        .status
        .as_deref()
        .map(parse_status_param)
        .transpose()?;

    let page = state
        .services
        .orders
        .list(auth_user.organization_id, query.page, query.limit, status)
        .await?;

    let mut items = Vec::with_capacity(page.orders.len());
    for model in page.orders {
        // Listing responses omit line detail; fetch via GET /orders/{id}.
        items.push(map_order(model, Vec::new())?);
    }

    let limit = query.limit.clamp(1, 100);
    let total_pages = page.total.div_ceil(limit);

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total: page.total,
        page: query.page.max(1),
        limit,
        total_pages,
    })))
}

/// Place an order. Stock is decremented per line inside one transaction;
/// the caller becomes the order's user.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Invalid lines", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not in organization", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate order number", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), ServiceError> {
    let (created, lines) = state
        .services
        .orders
        .create(auth_user.organization_id, auth_user.user_id, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(map_order(created, lines)?)),
    ))
}

/// Fetch one order with its lines.
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order retrieved", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let (found, lines) = state
        .services
        .orders
        .get(auth_user.organization_id, id)
        .await?;
    Ok(Json(ApiResponse::success(map_order(found, lines)?)))
}

/// Replace a PENDING order's lines, reconciling stock by net deltas.
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderLinesRequest,
    responses(
        (status = 200, description = "Order lines replaced", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is not PENDING", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOrderLinesRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let (updated, lines) = state
        .services
        .orders
        .update_lines(auth_user.organization_id, id, request)
        .await?;
    Ok(Json(ApiResponse::success(map_order(updated, lines)?)))
}

/// Complete or cancel a PENDING order. Cancelling restores stock.
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Illegal transition", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let updated = state
        .services
        .orders
        .update_status(auth_user.organization_id, id, request.status)
        .await?;

    let (model, lines) = state
        .services
        .orders
        .get(auth_user.organization_id, updated.id)
        .await?;
    Ok(Json(ApiResponse::success(map_order(model, lines)?)))
}

/// Delete an order, restoring held stock (CANCELLED orders restored
/// theirs already).
#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ServiceError> {
    state
        .services
        .orders
        .delete(auth_user.organization_id, id)
        .await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": id }),
    )))
}
