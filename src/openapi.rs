use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
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
        crate::handlers::addresses::create_address,
        crate::handlers::addresses::list_addresses,
        crate::handlers::carts::save_cart,
        crate::handlers::carts::get_cart,
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::checkout::create_session,
        crate::handlers::payment_webhooks::payment_webhook,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::entities::address::AddressSnapshot,
        crate::entities::order::DeliveryStatus,
        crate::entities::order::PaymentMethod,
        crate::entities::order::PaymentStatus,
        crate::services::pricing::CartLine,
        crate::services::pricing::ResolvedLineItem,
        crate::services::orders::CreateOrderInput,
        crate::services::orders::OrderResponse,
        crate::services::checkout::CreateSessionInput,
        crate::handlers::addresses::CreateAddressRequest,
        crate::handlers::addresses::AddressResponse,
        crate::handlers::addresses::AddressPayload,
        crate::handlers::addresses::AddressListPayload,
        crate::handlers::carts::SaveCartRequest,
        crate::handlers::carts::CartPayload,
        crate::handlers::products::ProductResponse,
        crate::handlers::products::ProductPayload,
        crate::handlers::products::ProductListPayload,
        crate::handlers::orders::OrderPayload,
        crate::handlers::orders::OrderListPayload,
        crate::handlers::checkout::SessionPayload,
        crate::handlers::payment_webhooks::WebhookPayload,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Products", description = "Catalog reads"),
        (name = "Cart", description = "Saved cart snapshots"),
        (name = "Addresses", description = "Delivery addresses"),
        (name = "Orders", description = "Checkout and order history"),
        (name = "Checkout", description = "Hosted payment sessions"),
        (name = "Payments", description = "Payment provider callbacks"),
    ),
    info(
        title = "storefront-api",
        description = "Storefront checkout and order API"
    )
)]
pub struct ApiDoc;

/// Swagger UI served at `/docs`, spec at `/api-docs/openapi.json`.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
