use axum::{extract::State, http::HeaderMap, response::IntoResponse};
use bytes::Bytes;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::handlers::common::success_response;
use crate::services::payment_gateway::{GatewayEvent, CHECKOUT_SESSION_COMPLETED};
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature, in `t=<unix ts>,v1=<hex hmac>` form.
pub const SIGNATURE_HEADER: &str = "x-gateway-signature";

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookPayload {
    pub received: bool,
    /// Present when a completion event materialized (or re-observed) an order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
}

/// Signed completion callback from the payment provider.
///
/// Fails closed: any signature problem is a 400 and nothing else runs. On a
/// verified completion event the cart in the session metadata is re-priced
/// against the current catalog and the order is materialized exactly once per
/// session id; redeliveries re-observe the existing order.
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    request_body = String,
    responses(
        (status = 200, description = "Webhook accepted", body = WebhookPayload),
        (status = 400, description = "Invalid signature or payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Address in session metadata not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    verify_signature(
        &headers,
        &body,
        state.config.payment_webhook_secret.as_bytes(),
        state.config.payment_webhook_tolerance_secs,
    )?;

    let event: GatewayEvent = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::Validation(format!("invalid webhook payload: {e}")))?;

    match event.event_type.as_str() {
        CHECKOUT_SESSION_COMPLETED => {
            let (order, created) = state
                .services
                .checkout
                .reconcile_completed_session(event.data.object)
                .await?;

            if created {
                info!(event_id = %event.id, order_id = %order.id, "completion event reconciled");
            }

            Ok(success_response(WebhookPayload {
                received: true,
                order_id: Some(order.id),
            }))
        }
        other => {
            info!(event_id = %event.id, event_type = %other, "ignoring unhandled webhook event");
            Ok(success_response(WebhookPayload {
                received: true,
                order_id: None,
            }))
        }
    }
}

/// Verify the timestamped HMAC signature over the raw body.
///
/// The signed input is `"{t}.{body}"`; `v1` is its hex HMAC-SHA256 under the
/// shared secret. Timestamps outside the tolerance window are rejected even
/// with a valid MAC, which bounds replay of captured deliveries.
fn verify_signature(
    headers: &HeaderMap,
    payload: &Bytes,
    secret: &[u8],
    tolerance_secs: u64,
) -> Result<(), ServiceError> {
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            warn!("webhook delivery without signature header");
            ServiceError::SignatureInvalid("missing signature header".to_string())
        })?;

    let (timestamp, signature) = parse_signature_header(header)
        .ok_or_else(|| ServiceError::SignatureInvalid("malformed signature header".to_string()))?;

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| ServiceError::SignatureInvalid("malformed timestamp".to_string()))?;
    let now = chrono::Utc::now().timestamp();
    if (now - ts).unsigned_abs() > tolerance_secs {
        warn!(timestamp = ts, "webhook signature timestamp outside tolerance");
        return Err(ServiceError::SignatureInvalid(
            "timestamp outside tolerance".to_string(),
        ));
    }

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| ServiceError::Internal(format!("webhook secret unusable: {e}")))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    if !constant_time_eq(&expected, signature) {
        warn!("webhook signature verification failed");
        return Err(ServiceError::SignatureInvalid(
            "signature mismatch".to_string(),
        ));
    }

    Ok(())
}

/// Split `t=<ts>,v1=<hex>` into its parts.
fn parse_signature_header(header: &str) -> Option<(&str, &str)> {
    let mut timestamp = None;
    let mut signature = None;

    for part in header.split(',') {
        let mut it = part.trim().splitn(2, '=');
        match (it.next(), it.next()) {
            (Some("t"), Some(value)) => timestamp = Some(value),
            (Some("v1"), Some(value)) => signature = Some(value),
            _ => {}
        }
    }

    Some((timestamp?, signature?))
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}
