use axum::{extract::State, response::IntoResponse, routing::put, Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::common::success_response;
use crate::services::pricing::CartLine;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", put(save_cart).get(get_cart))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveCartRequest {
    pub items: Vec<CartLine>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartPayload {
    pub items: Vec<CartLine>,
}

/// Replace the principal's saved cart snapshot
#[utoipa::path(
    put,
    path = "/api/v1/cart",
    request_body = SaveCartRequest,
    responses(
        (status = 200, description = "Sanitized snapshot as stored", body = CartPayload),
        (status = 401, description = "Unauthenticated", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn save_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SaveCartRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let items = state
        .services
        .carts
        .save_cart(&user.user_id, payload.items)
        .await?;

    Ok(success_response(CartPayload { items }))
}

/// Return the principal's saved cart snapshot
#[utoipa::path(
    get,
    path = "/api/v1/cart",
    responses(
        (status = 200, description = "Stored snapshot, empty if never saved", body = CartPayload),
        (status = 401, description = "Unauthenticated", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let items = state.services.carts.get_cart(&user.user_id).await?;
    Ok(success_response(CartPayload { items }))
}
