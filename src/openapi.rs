//! OpenAPI document served at `/api-docs/openapi.json`, browsable at `/docs`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::auth::login,
        crate::handlers::organizations::create_with_owner,
        crate::handlers::organizations::get_own_organization,
        crate::handlers::organizations::get_organization,
        crate::handlers::organizations::update_organization,
        crate::handlers::organizations::delete_organization,
        crate::handlers::users::list_users,
        crate::handlers::users::create_user,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
        crate::handlers::items::list_items,
        crate::handlers::items::create_item,
        crate::handlers::items::average_cost_price,
        crate::handlers::items::get_item,
        crate::handlers::items::update_item,
        crate::handlers::items::delete_item,
        crate::handlers::items::add_stock,
        crate::handlers::items::reduce_stock,
        crate::handlers::expenses::list_expenses,
        crate::handlers::expenses::create_expense,
        crate::handlers::expenses::get_expense,
        crate::handlers::expenses::update_expense,
        crate::handlers::expenses::delete_expense,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::create_order,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order,
        crate::handlers::orders::update_order_status,
        crate::handlers::orders::delete_order,
        crate::handlers::stats::dashboard,
        crate::handlers::stats::chart,
        crate::handlers::analytics::item_cost,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::auth::AccessToken,
        crate::models::OrderStatus,
        crate::models::UserRole,
        crate::models::ExpenseType,
        crate::models::ExpenseNature,
        crate::handlers::auth::LoginRequest,
        crate::handlers::auth::LoginResponse,
        crate::handlers::users::UserResponse,
        crate::handlers::organizations::OrganizationResponse,
        crate::handlers::organizations::BootstrapResponse,
        crate::handlers::items::ItemResponse,
        crate::handlers::items::StockAdjustmentRequest,
        crate::handlers::expenses::ExpenseResponse,
        crate::handlers::orders::OrderResponse,
        crate::handlers::orders::OrderLineResponse,
        crate::handlers::orders::UpdateOrderStatusRequest,
        crate::services::organizations::CreateOrganizationWithOwnerRequest,
        crate::services::organizations::UpdateOrganizationRequest,
        crate::services::users::CreateUserRequest,
        crate::services::users::UpdateUserRequest,
        crate::services::items::CreateItemRequest,
        crate::services::items::UpdateItemRequest,
        crate::services::expenses::CreateExpenseRequest,
        crate::services::expenses::UpdateExpenseRequest,
        crate::services::orders::CreateOrderRequest,
        crate::services::orders::UpdateOrderLinesRequest,
        crate::services::orders::OrderLineRequest,
        crate::services::stats::DashboardStats,
        crate::services::stats::WindowStats,
        crate::services::stats::OrderSummary,
        crate::services::stats::ItemSummary,
        crate::services::stats::ChartData,
        crate::services::stats::ChartPoint,
        crate::services::stats::ChartRange,
        crate::services::analytics::ItemCostRow,
        crate::services::analytics::ItemCostPrice,
        crate::services::analytics::AverageCostPriceResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Login and token issuance"),
        (name = "organizations", description = "Tenant management and bootstrap"),
        (name = "users", description = "Staff accounts"),
        (name = "items", description = "Catalog and inventory"),
        (name = "expenses", description = "Direct and indirect cost tracking"),
        (name = "orders", description = "Order placement and lifecycle"),
        (name = "stats", description = "Dashboard aggregates"),
        (name = "analytics", description = "Cost allocation analytics"),
    ),
    info(
        title = "Tillpoint API",
        description = "Multi-tenant point-of-sale backend",
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_builds() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_string(&doc).expect("openapi serializes");
        assert!(json.contains("/api/v1/orders"));
        assert!(json.contains("/api/v1/items/average-cost-price"));
    }
}
