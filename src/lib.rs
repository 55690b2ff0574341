//! Tillpoint API library.
//!
//! Multi-tenant point-of-sale backend: organizations, users, items,
//! orders, expenses and cost analytics behind a JWT/role-gated REST API.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::HeaderValue,
    middleware,
    response::Json,
    routing::{delete, get, post, put},
    Extension, Router,
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{consts as perm, AuthRouterExt, AuthService};
use crate::handlers::AppServices;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub auth: Arc<AuthService>,
    pub services: AppServices,
}

/// Standard success envelope.
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

/// Standard API result type for JSON responses.
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// All `/api/v1` routes, permission-gated per router group.
pub fn api_v1_routes() -> Router<AppState> {
    let public = Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .route("/auth/login", post(handlers::auth::login))
        // Guarded by the x-master-key header inside the handler.
        .route(
            "/organizations/create-with-owner",
            post(handlers::organizations::create_with_owner),
        );

    let organizations_read = Router::new()
        .route(
            "/organizations",
            get(handlers::organizations::get_own_organization),
        )
        .route(
            "/organizations/:id",
            get(handlers::organizations::get_organization),
        )
        .with_permission(perm::ORGANIZATIONS_READ);

    let organizations_manage = Router::new()
        .route(
            "/organizations/:id",
            put(handlers::organizations::update_organization),
        )
        .with_permission(perm::ORGANIZATIONS_MANAGE);

    let organizations_delete = Router::new()
        .route(
            "/organizations/:id",
            delete(handlers::organizations::delete_organization),
        )
        .with_permission(perm::ORGANIZATIONS_DELETE);

    let users_read = Router::new()
        .route("/users", get(handlers::users::list_users))
        .route("/users/:id", get(handlers::users::get_user))
        .with_permission(perm::USERS_READ);

    let users_manage = Router::new()
        .route("/users", post(handlers::users::create_user))
        .route("/users/:id", put(handlers::users::update_user))
        .route("/users/:id", delete(handlers::users::delete_user))
        .with_permission(perm::USERS_MANAGE);

    let items_read = Router::new()
        .route("/items", get(handlers::items::list_items))
        .route(
            "/items/average-cost-price",
            get(handlers::items::average_cost_price),
        )
        .route("/items/:id", get(handlers::items::get_item))
        .with_permission(perm::ITEMS_READ);

    let items_manage = Router::new()
        .route("/items", post(handlers::items::create_item))
        .route("/items/:id", put(handlers::items::update_item))
        .route("/items/:id", delete(handlers::items::delete_item))
        .route("/items/:id/add-stock", post(handlers::items::add_stock))
        .route(
            "/items/:id/reduce-stock",
            post(handlers::items::reduce_stock),
        )
        .with_permission(perm::ITEMS_MANAGE);

    let expenses_read = Router::new()
        .route("/expenses", get(handlers::expenses::list_expenses))
        .route("/expenses/:id", get(handlers::expenses::get_expense))
        .with_permission(perm::EXPENSES_READ);

    let expenses_manage = Router::new()
        .route("/expenses", post(handlers::expenses::create_expense))
        .route("/expenses/:id", put(handlers::expenses::update_expense))
        .route("/expenses/:id", delete(handlers::expenses::delete_expense))
        .with_permission(perm::EXPENSES_MANAGE);

    let orders_read = Router::new()
        .route("/orders", get(handlers::orders::list_orders))
        .route("/orders/:id", get(handlers::orders::get_order))
        .with_permission(perm::ORDERS_READ);

    let orders_create = Router::new()
        .route("/orders", post(handlers::orders::create_order))
        .with_permission(perm::ORDERS_CREATE);

    let orders_manage = Router::new()
        .route("/orders/:id", put(handlers::orders::update_order))
        .route(
            "/orders/:id/status",
            put(handlers::orders::update_order_status),
        )
        .route("/orders/:id", delete(handlers::orders::delete_order))
        .with_permission(perm::ORDERS_MANAGE);

    let stats = Router::new()
        .route("/stats/dashboard", get(handlers::stats::dashboard))
        .route("/stats/chart", get(handlers::stats::chart))
        .with_permission(perm::STATS_READ);

    let analytics = Router::new()
        .route("/analytics/item-cost", get(handlers::analytics::item_cost))
        .with_permission(perm::ANALYTICS_READ);

    Router::new()
        .merge(public)
        .merge(organizations_read)
        .merge(organizations_manage)
        .merge(organizations_delete)
        .merge(users_read)
        .merge(users_manage)
        .merge(items_read)
        .merge(items_manage)
        .merge(expenses_read)
        .merge(expenses_manage)
        .merge(orders_read)
        .merge(orders_create)
        .merge(orders_manage)
        .merge(stats)
        .merge(analytics)
}

/// The complete application router with the full middleware stack.
pub fn app_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let auth_service = state.auth.clone();
    let request_timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        .nest("/api/v1", api_v1_routes())
        .merge(
            SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
        .layer(Extension(auth_service))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

fn cors_layer(config: &config::AppConfig) -> CorsLayer {
    if let Some(raw) = &config.cors_allowed_origins {
        let origins: Vec<HeaderValue> = raw
            .split(',')
            .filter_map(|origin| origin.trim().parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    } else if config.cors_allow_any_origin {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    }
}

async fn api_status() -> Json<ApiResponse<Value>> {
    let status_data = json!({
        "status": "ok",
        "service": "tillpoint-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Json(ApiResponse::success(status_data))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}

/// Request logging middleware.
async fn request_logging_middleware(
    request: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    tracing::info!(
        method = %method,
        uri = %uri,
        status = response.status().as_u16(),
        elapsed_ms = duration.as_millis() as u64,
        "request completed"
    );

    response
}
