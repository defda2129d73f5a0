use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::product;
use crate::errors::ServiceError;
use crate::handlers::common::success_response;
use crate::services::pricing::normalize_image;
use crate::{AppState, ListQuery};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/:id", get(get_product))
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub offer_price: Option<Decimal>,
    /// Normalized from the legacy image column; always a parseable URL or null
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<product::Model> for ProductResponse {
    fn from(model: product::Model) -> Self {
        let image_url = normalize_image(model.image.as_ref()).map(|url| url.to_string());
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            offer_price: model.offer_price,
            image_url,
            category: model.category,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductPayload {
    pub product: ProductResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductListPayload {
    pub products: Vec<ProductResponse>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

/// Browse the catalog (global read, no auth required)
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(
        ("page" = Option<u64>, Query, description = "1-based page number"),
        ("limit" = Option<u64>, Query, description = "Page size")
    ),
    responses(
        (status = 200, description = "One page of products", body = ProductListPayload)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = state
        .services
        .catalog
        .list_products(query.page, query.limit)
        .await?;

    Ok(success_response(ProductListPayload {
        products: page.products.into_iter().map(Into::into).collect(),
        total: page.total,
        page: page.page,
        limit: page.limit,
    }))
}

/// Fetch a single product
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "The product", body = ProductPayload),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.catalog.get_product(id).await?;
    Ok(success_response(ProductPayload {
        product: product.into(),
    }))
}
