use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI document for the v1 API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vendora API",
        version = "0.1.0",
        description = "Multi-vendor commerce back office: order fulfillment, stock control, billing, and notifications."
    ),
    paths(
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_my_orders,
        crate::handlers::orders::list_all_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::get_order_lines,
        crate::handlers::orders::update_order_status,
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::low_stock,
        crate::handlers::products::list_categories,
        crate::handlers::products::create_category,
        crate::handlers::products::list_units,
        crate::handlers::products::create_unit,
        crate::handlers::vendors::list_vendors,
        crate::handlers::vendors::approve_vendor,
        crate::handlers::notifications::list_notifications,
        crate::handlers::notifications::mark_notification_read,
        crate::handlers::reports::orders_by_status,
        crate::handlers::reports::revenue,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::entities::order::OrderStatus,
        crate::services::orders::CreateOrderLine,
        crate::services::orders::OrderResponse,
        crate::services::orders::OrderLineResponse,
        crate::services::products::CreateProductRequest,
        crate::services::products::UpdateProductRequest,
        crate::services::products::ProductResponse,
        crate::services::products::LowStockItem,
        crate::services::reports::StatusCount,
        crate::services::reports::RevenueSummary,
        crate::handlers::orders::CreateOrderRequest,
        crate::handlers::orders::UpdateOrderStatusRequest,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "orders", description = "Order creation and fulfillment"),
        (name = "catalog", description = "Products, categories, units"),
        (name = "vendors", description = "Vendor onboarding"),
        (name = "notifications", description = "User notifications"),
        (name = "reports", description = "Vendor dashboards"),
    )
)]
pub struct ApiDoc;

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

/// Swagger UI router, mounted next to the API.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
