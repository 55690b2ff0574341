use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::organization,
    errors::ServiceError,
    handlers::users::UserResponse,
    services::organizations::{CreateOrganizationWithOwnerRequest, UpdateOrganizationRequest},
    ApiResponse, AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrganizationResponse {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<organization::Model> for OrganizationResponse {
    fn from(model: organization::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BootstrapResponse {
    pub organization: OrganizationResponse,
    pub owner: UserResponse,
}

/// The bootstrap endpoint is open (no tenant exists yet) but demands the
/// configured master key.
fn require_master_key(state: &AppState, headers: &HeaderMap) -> Result<(), ServiceError> {
    let configured = state
        .config
        .master_bootstrap_key
        .as_deref()
        .ok_or_else(|| {
            ServiceError::Forbidden("Organization bootstrap is disabled".to_string())
        })?;

    let provided = headers
        .get("x-master-key")
        .and_then(|value| value.to_str().ok());

    if provided != Some(configured) {
        return Err(ServiceError::Forbidden(
            "Invalid master bootstrap key".to_string(),
        ));
    }

    Ok(())
}

/// Bootstrap a new organization together with its OWNER account.
#[utoipa::path(
    post,
    path = "/api/v1/organizations/create-with-owner",
    request_body = CreateOrganizationWithOwnerRequest,
    responses(
        (status = 201, description = "Organization bootstrapped", body = ApiResponse<BootstrapResponse>),
        (status = 403, description = "Missing or invalid master key", body = crate::errors::ErrorResponse),
        (status = 409, description = "Organization name or email taken", body = crate::errors::ErrorResponse),
    ),
    tag = "organizations"
)]
pub async fn create_with_owner(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateOrganizationWithOwnerRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BootstrapResponse>>), ServiceError> {
    require_master_key(&state, &headers)?;

    let (org, owner) = state.services.organizations.create_with_owner(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(BootstrapResponse {
            organization: org.into(),
            owner: owner.into(),
        })),
    ))
}

/// The actor's own organization. There is no cross-tenant listing.
#[utoipa::path(
    get,
    path = "/api/v1/organizations",
    responses(
        (status = 200, description = "Organization retrieved", body = ApiResponse<OrganizationResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "organizations"
)]
pub async fn get_own_organization(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<OrganizationResponse>>, ServiceError> {
    let org = state
        .services
        .organizations
        .get(auth_user.organization_id)
        .await?;
    Ok(Json(ApiResponse::success(org.into())))
}

/// Fetch an organization by id; anything but the actor's own answers 404.
#[utoipa::path(
    get,
    path = "/api/v1/organizations/{id}",
    params(("id" = Uuid, Path, description = "Organization id")),
    responses(
        (status = 200, description = "Organization retrieved", body = ApiResponse<OrganizationResponse>),
        (status = 404, description = "Organization not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "organizations"
)]
pub async fn get_organization(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrganizationResponse>>, ServiceError> {
    if id != auth_user.organization_id {
        return Err(ServiceError::NotFound("Organization not found".to_string()));
    }
    let org = state.services.organizations.get(id).await?;
    Ok(Json(ApiResponse::success(org.into())))
}

/// Rename the actor's organization.
#[utoipa::path(
    put,
    path = "/api/v1/organizations/{id}",
    params(("id" = Uuid, Path, description = "Organization id")),
    request_body = UpdateOrganizationRequest,
    responses(
        (status = 200, description = "Organization updated", body = ApiResponse<OrganizationResponse>),
        (status = 404, description = "Organization not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already taken", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "organizations"
)]
pub async fn update_organization(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOrganizationRequest>,
) -> Result<Json<ApiResponse<OrganizationResponse>>, ServiceError> {
    if id != auth_user.organization_id {
        return Err(ServiceError::NotFound("Organization not found".to_string()));
    }
    let org = state.services.organizations.rename(id, request).await?;
    Ok(Json(ApiResponse::success(org.into())))
}

/// Delete the actor's organization and everything in it.
#[utoipa::path(
    delete,
    path = "/api/v1/organizations/{id}",
    params(("id" = Uuid, Path, description = "Organization id")),
    responses(
        (status = 200, description = "Organization deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Organization not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "organizations"
)]
pub async fn delete_organization(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ServiceError> {
    if id != auth_user.organization_id {
        return Err(ServiceError::NotFound("Organization not found".to_string()));
    }
    state.services.organizations.delete(id).await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": id }),
    )))
}
