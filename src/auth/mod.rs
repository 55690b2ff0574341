//! Authentication and authorization.
//!
//! JWT access tokens carry the user's id, organization, role and the
//! permission strings derived from that role, so route gating never hits
//! the database. Passwords are argon2 PHC hashes.

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::{entities::user, errors::ServiceError, models::UserRole};

pub mod permissions;

pub use permissions::{consts, role_permissions};

/// Claim structure for JWT access tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Organization (tenant) id
    pub org: String,
    /// Role name in wire form
    pub role: String,
    /// Permissions derived from the role at issue time
    pub permissions: Vec<String>,
    /// Unique token id
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated caller extracted from a validated token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub role: UserRole,
    pub permissions: Vec<String>,
    pub token_id: String,
}

impl AuthUser {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    pub fn has_role(&self, role: UserRole) -> bool {
        self.role == role
    }
}

/// Authentication configuration.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    pub token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        issuer: String,
        audience: String,
        token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            issuer,
            audience,
            token_expiration,
        }
    }
}

/// Token payload returned by the login endpoint.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Issues and validates access tokens.
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Generate an access token for a user row.
    pub fn issue_token(&self, user: &user::Model) -> Result<AccessToken, ServiceError> {
        let role: UserRole = user
            .role
            .parse()
            .map_err(|_| ServiceError::InternalError(format!("unknown role: {}", user.role)))?;

        let now = Utc::now();
        let expires = now
            + ChronoDuration::from_std(self.config.token_expiration)
                .map_err(|_| ServiceError::InternalError("invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            org: user.organization_id.to_string(),
            role: user.role.clone(),
            permissions: role_permissions(role)
                .iter()
                .map(|p| p.to_string())
                .collect(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::InternalError(format!("failed to sign token: {e}")))?;

        Ok(AccessToken {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.token_expiration.as_secs(),
        })
    }

    /// Validate a token and decode its claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.config.audience.as_str()]);
        validation.set_issuer(&[self.config.issuer.as_str()]);

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            debug!(error = %e, "token validation failed");
            ServiceError::Unauthorized("Invalid or expired token".to_string())
        })?;

        Ok(data.claims)
    }

    /// Validate a token and build the request-scoped [`AuthUser`].
    pub fn authenticate(&self, token: &str) -> Result<AuthUser, ServiceError> {
        let claims = self.validate_token(token)?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::Unauthorized("Malformed token subject".to_string()))?;
        let organization_id = Uuid::parse_str(&claims.org)
            .map_err(|_| ServiceError::Unauthorized("Malformed token tenant".to_string()))?;
        let role: UserRole = claims
            .role
            .parse()
            .map_err(|_| ServiceError::Unauthorized("Unknown role in token".to_string()))?;

        Ok(AuthUser {
            user_id,
            organization_id,
            role,
            permissions: claims.permissions,
            token_id: claims.jti,
        })
    }
}

/// Hash a password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    use argon2::password_hash::{rand_core::OsRng, SaltString};
    use argon2::{Argon2, PasswordHasher};

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ServiceError::InternalError(format!("failed to hash password: {e}")))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored argon2 hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Authentication middleware: validates the bearer token and stores the
/// resulting [`AuthUser`] in the request extensions.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return ServiceError::InternalError("authentication service not available".to_string())
                .into_response();
        }
    };

    let token = match bearer_token(request.headers()) {
        Some(token) => token.to_string(),
        None => {
            return ServiceError::Unauthorized("Missing bearer token".to_string()).into_response()
        }
    };

    match auth_service.authenticate(&token) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Permission middleware: rejects the request unless the authenticated
/// user carries the required permission.
pub async fn permission_middleware(
    State(required_permission): State<String>,
    request: Request,
    next: Next,
) -> Response {
    let user = match request.extensions().get::<AuthUser>() {
        Some(user) => user.clone(),
        None => {
            return ServiceError::Unauthorized("Missing authentication".to_string())
                .into_response()
        }
    };

    if !user.has_permission(&required_permission) {
        return ServiceError::Forbidden(format!(
            "Missing required permission: {required_permission}"
        ))
        .into_response();
    }

    next.run(request).await
}

#[async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ServiceError::Unauthorized("Missing authentication".to_string()))
    }
}

/// Extension methods for gating routers behind auth and permissions.
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_permission(self, permission: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_permission(self, permission: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            permission.to_string(),
            permission_middleware,
        ))
        .with_auth()
    }
}
