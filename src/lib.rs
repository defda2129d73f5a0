//! storefront-api
//!
//! Storefront backend: catalog reads, saved cart snapshots, two checkout
//! paths (cash-on-delivery and provider-hosted payment sessions) converging
//! on one order representation, and lazy delivery-status promotion at listing
//! time.
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
pub mod openapi;
pub mod services;

use axum::{extract::State, response::Json, routing::get, Router};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::{AuthRouterExt, AuthService};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

/// Common query parameters for list endpoints
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

/// Success wrapper producing `{"success": true, ...payload}` — the payload's
/// fields are flattened next to the flag, matching the JSON contract the UI
/// consumes. Errors use [`errors::ErrorResponse`] instead.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
        }
    }
}

/// Full v1 API surface. Everything except catalog reads and the
/// signature-verified payment webhook sits behind the identity provider.
pub fn api_v1_routes(auth_service: Arc<AuthService>) -> Router<AppState> {
    let protected = Router::new()
        .nest("/addresses", handlers::addresses::routes())
        .nest("/cart", handlers::carts::routes())
        .nest("/orders", handlers::orders::routes())
        .nest("/checkout", handlers::checkout::routes())
        .with_auth(auth_service);

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        // Catalog is globally readable
        .nest("/products", handlers::products::routes())
        // Signature-verified, not principal-authenticated
        .route(
            "/payments/webhook",
            axum::routing::post(handlers::payment_webhooks::payment_webhook),
        )
        .merge(protected)
}

async fn api_status() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");
    Json(json!({
        "success": true,
        "status": "ok",
        "version": version,
        "service": "storefront-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    Json(json!({
        "success": db_status == "healthy",
        "status": db_status,
        "checks": { "database": db_status },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
