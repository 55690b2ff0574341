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
    entities::expense,
    errors::ServiceError,
    services::expenses::{CreateExpenseRequest, ExpenseFilter, UpdateExpenseRequest},
    ApiResponse, AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExpenseResponse {
    pub id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub expense_type: String,
    pub nature: String,
    pub item_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub organization_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<expense::Model> for ExpenseResponse {
    fn from(model: expense::Model) -> Self {
        Self {
            id: model.id,
            description: model.description,
            amount: model.amount,
            expense_type: model.expense_type,
            nature: model.nature,
            item_id: model.item_id,
            user_id: model.user_id,
            organization_id: model.organization_id,
            created_at: model.created_at,
        }
    }
}

/// List expenses, optionally filtered by item, user, type or nature.
#[utoipa::path(
    get,
    path = "/api/v1/expenses",
    params(ExpenseFilter),
    responses(
        (status = 200, description = "Expenses retrieved", body = ApiResponse<Vec<ExpenseResponse>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "expenses"
)]
pub async fn list_expenses(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(filter): Query<ExpenseFilter>,
) -> Result<Json<ApiResponse<Vec<ExpenseResponse>>>, ServiceError> {
    let expenses = state
        .services
        .expenses
        .list(auth_user.organization_id, filter)
        .await?;
    Ok(Json(ApiResponse::success(
        expenses.into_iter().map(ExpenseResponse::from).collect(),
    )))
}

/// Record an expense. DIRECT expenses take INGREDIENT/PACKAGING types,
/// INDIRECT expenses take the overhead types; mismatches are rejected.
#[utoipa::path(
    post,
    path = "/api/v1/expenses",
    request_body = CreateExpenseRequest,
    responses(
        (status = 201, description = "Expense recorded", body = ApiResponse<ExpenseResponse>),
        (status = 400, description = "Invalid type/nature pairing", body = crate::errors::ErrorResponse),
        (status = 404, description = "Linked item or user not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "expenses"
)]
pub async fn create_expense(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ExpenseResponse>>), ServiceError> {
    let created = state
        .services
        .expenses
        .create(auth_user.organization_id, request)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(created.into())),
    ))
}

/// Fetch one expense.
#[utoipa::path(
    get,
    path = "/api/v1/expenses/{id}",
    params(("id" = Uuid, Path, description = "Expense id")),
    responses(
        (status = 200, description = "Expense retrieved", body = ApiResponse<ExpenseResponse>),
        (status = 404, description = "Expense not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "expenses"
)]
pub async fn get_expense(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ExpenseResponse>>, ServiceError> {
    let found = state
        .services
        .expenses
        .get(auth_user.organization_id, id)
        .await?;
    Ok(Json(ApiResponse::success(found.into())))
}

/// Update an expense; the type/nature pairing is re-checked over the
/// merged result.
#[utoipa::path(
    put,
    path = "/api/v1/expenses/{id}",
    params(("id" = Uuid, Path, description = "Expense id")),
    request_body = UpdateExpenseRequest,
    responses(
        (status = 200, description = "Expense updated", body = ApiResponse<ExpenseResponse>),
        (status = 400, description = "Invalid type/nature pairing", body = crate::errors::ErrorResponse),
        (status = 404, description = "Expense not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "expenses"
)]
pub async fn update_expense(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateExpenseRequest>,
) -> Result<Json<ApiResponse<ExpenseResponse>>, ServiceError> {
    let updated = state
        .services
        .expenses
        .update(auth_user.organization_id, id, request)
        .await?;
    Ok(Json(ApiResponse::success(updated.into())))
}

/// Delete an expense.
#[utoipa::path(
    delete,
    path = "/api/v1/expenses/{id}",
    params(("id" = Uuid, Path, description = "Expense id")),
    responses(
        (status = 200, description = "Expense deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Expense not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "expenses"
)]
pub async fn delete_expense(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ServiceError> {
    state
        .services
        .expenses
        .delete(auth_user.organization_id, id)
        .await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": id }),
    )))
}
