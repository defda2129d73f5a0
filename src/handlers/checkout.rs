use axum::{extract::State, response::IntoResponse, routing::post, Json, Router};
use serde::Serialize;
use url::Url;
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::common::success_response;
use crate::services::checkout::CreateSessionInput;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/session", post(create_session))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionPayload {
    pub session_id: String,
    /// Provider-hosted payment page to redirect the buyer to
    pub url: Url,
}

/// Start the hosted-payment path: price the cart, create a provider session,
/// and hand back the redirect URL. No order exists until the provider's
/// completion webhook is verified and reconciled.
#[utoipa::path(
    post,
    path = "/api/v1/checkout/session",
    request_body = CreateSessionInput,
    responses(
        (status = 200, description = "Hosted session created", body = SessionPayload),
        (status = 400, description = "No valid items, or missing email claim", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthenticated", body = crate::errors::ErrorResponse),
        (status = 404, description = "Address not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Payment provider failure", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn create_session(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateSessionInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let email = user
        .email
        .as_deref()
        .ok_or_else(|| ServiceError::Validation("user email not found".to_string()))?;

    let checkout = state
        .services
        .checkout
        .create_session(&user.user_id, email, payload)
        .await?;

    Ok(success_response(SessionPayload {
        session_id: checkout.session_id,
        url: checkout.url,
    }))
}
