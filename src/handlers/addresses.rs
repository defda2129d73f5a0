use axum::{
    extract::State,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::entities::address;
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response, validate_input};
use crate::services::addresses::NewAddress;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", post(create_address).get(list_addresses))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAddressRequest {
    #[validate(length(min = 1))]
    pub full_name: String,
    #[validate(length(min = 1))]
    pub phone_number: String,
    #[validate(length(min = 1))]
    pub pincode: String,
    #[validate(length(min = 1))]
    pub area: String,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 1))]
    pub state: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddressResponse {
    pub id: Uuid,
    pub full_name: String,
    pub phone_number: String,
    pub pincode: String,
    pub area: String,
    pub city: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
}

impl From<address::Model> for AddressResponse {
    fn from(model: address::Model) -> Self {
        Self {
            id: model.id,
            full_name: model.full_name,
            phone_number: model.phone_number,
            pincode: model.pincode,
            area: model.area,
            city: model.city,
            state: model.state,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddressPayload {
    pub address: AddressResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddressListPayload {
    pub addresses: Vec<AddressResponse>,
}

/// Create an address owned by the authenticated principal
#[utoipa::path(
    post,
    path = "/api/v1/addresses",
    request_body = CreateAddressRequest,
    responses(
        (status = 201, description = "Address created", body = AddressPayload),
        (status = 400, description = "Missing required fields", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthenticated", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Addresses"
)]
pub async fn create_address(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateAddressRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let address = state
        .services
        .addresses
        .create_address(
            &user.user_id,
            NewAddress {
                full_name: payload.full_name,
                phone_number: payload.phone_number,
                pincode: payload.pincode,
                area: payload.area,
                city: payload.city,
                state: payload.state,
            },
        )
        .await?;

    Ok(created_response(AddressPayload {
        address: address.into(),
    }))
}

/// List the principal's addresses, newest first
#[utoipa::path(
    get,
    path = "/api/v1/addresses",
    responses(
        (status = 200, description = "Addresses for the principal", body = AddressListPayload),
        (status = 401, description = "Unauthenticated", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Addresses"
)]
pub async fn list_addresses(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let addresses = state
        .services
        .addresses
        .list_addresses(&user.user_id)
        .await?;

    Ok(success_response(AddressListPayload {
        addresses: addresses.into_iter().map(Into::into).collect(),
    }))
}
