use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    auth::{self, AccessToken},
    errors::ServiceError,
    handlers::users::UserResponse,
    ApiResponse, AppState,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: AccessToken,
    pub user: UserResponse,
}

/// Exchange credentials for an access token.
///
/// A wrong email and a wrong password answer identically so the endpoint
/// cannot be used to probe which accounts exist.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Malformed credentials", body = crate::errors::ErrorResponse),
        (status = 401, description = "Invalid email or password", body = crate::errors::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ServiceError> {
    request
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let user = state
        .services
        .users
        .find_by_email(&request.email)
        .await?
        .ok_or_else(|| ServiceError::Unauthorized("Invalid email or password".to_string()))?;

    if !auth::verify_password(&request.password, &user.password_hash) {
        return Err(ServiceError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let token = state.auth.issue_token(&user)?;

    Ok(Json(ApiResponse::success(LoginResponse {
        token,
        user: user.into(),
    })))
}
