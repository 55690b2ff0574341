use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::user,
    errors::ServiceError,
    services::users::{CreateUserRequest, UpdateUserRequest},
    ApiResponse, AppState,
};

/// API view of a user. Never carries the password hash.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub organization_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: model.role,
            organization_id: model.organization_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// List the organization's users.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "Users retrieved", body = ApiResponse<Vec<UserResponse>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, ServiceError> {
    let users = state
        .services
        .users
        .list(auth_user.organization_id)
        .await?;
    Ok(Json(ApiResponse::success(
        users.into_iter().map(UserResponse::from).collect(),
    )))
}

/// Create a user in the actor's organization.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ServiceError> {
    let created = state
        .services
        .users
        .create(auth_user.organization_id, request)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(created.into())),
    ))
}

/// Fetch one user.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User retrieved", body = ApiResponse<UserResponse>),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<UserResponse>>, ServiceError> {
    let user = state
        .services
        .users
        .get(auth_user.organization_id, id)
        .await?;
    Ok(Json(ApiResponse::success(user.into())))
}

/// Update a user (name, email, role or password).
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserResponse>),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ServiceError> {
    let updated = state
        .services
        .users
        .update(auth_user.organization_id, id, request)
        .await?;
    Ok(Json(ApiResponse::success(updated.into())))
}

/// Delete a user. Deleting the acting account is rejected.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Cannot delete own account", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ServiceError> {
    state
        .services
        .users
        .delete(auth_user.organization_id, id, auth_user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": id }),
    )))
}
