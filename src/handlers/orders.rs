use axum::{extract::State, response::IntoResponse, routing::post, Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response};
use crate::services::orders::{CreateOrderInput, OrderResponse};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", post(create_order).get(list_orders))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderPayload {
    pub order: OrderResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderListPayload {
    pub orders: Vec<OrderResponse>,
}

fn require_email(user: &AuthUser) -> Result<&str, ServiceError> {
    user.email
        .as_deref()
        .ok_or_else(|| ServiceError::Validation("user email not found".to_string()))
}

/// Cash-on-delivery checkout: convert a cart snapshot into a placed order.
///
/// The request carries product ids and quantities only; pricing and the total
/// are resolved server-side from the catalog.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderInput,
    responses(
        (status = 201, description = "Order placed", body = OrderPayload),
        (status = 400, description = "No valid items, or missing email claim", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthenticated", body = crate::errors::ErrorResponse),
        (status = 404, description = "Address not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Persistence failure", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let email = require_email(&user)?;

    let order = state
        .services
        .orders
        .create_cod_order(&user.user_id, email, payload)
        .await?;

    Ok(created_response(OrderPayload { order }))
}

/// List the principal's orders, newest first. Orders past the delivery window
/// are promoted to delivered before the set is returned.
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    responses(
        (status = 200, description = "Orders for the principal", body = OrderListPayload),
        (status = 401, description = "Unauthenticated", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let orders = state.services.orders.list_orders(&user.user_id).await?;
    Ok(success_response(OrderListPayload { orders }))
}
