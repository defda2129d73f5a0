//! Hosted payment provider client.
//!
//! The provider owns the actual payment flow: we create a checkout session,
//! redirect the buyer to the returned URL, and learn about completion through
//! a signed webhook. Only the session contract lives here.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::errors::ServiceError;
use crate::services::pricing::SessionLineItem;

/// Webhook event type emitted when a buyer finishes the hosted flow.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<GatewayError> for ServiceError {
    fn from(err: GatewayError) -> Self {
        ServiceError::PaymentProvider(err.to_string())
    }
}

/// Request payload for creating a hosted checkout session.
#[derive(Debug, Serialize)]
pub struct CreateCheckoutSessionRequest {
    pub mode: String,
    pub line_items: Vec<SessionLineItem>,
    pub success_url: String,
    pub cancel_url: String,
    /// Opaque string map echoed back on the completion webhook; carries the
    /// owner id, contact email, address id and serialized cart.
    pub metadata: HashMap<String, String>,
}

/// A hosted session as the provider represents it, both in the creation
/// response and inside completion webhook events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySession {
    pub id: String,
    /// Redirect URL; present on creation, absent in webhook payloads
    #[serde(default)]
    pub url: Option<Url>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Signed webhook event envelope.
#[derive(Debug, Deserialize)]
pub struct GatewayEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: GatewayEventData,
}

#[derive(Debug, Deserialize)]
pub struct GatewayEventData {
    pub object: GatewaySession,
}

#[derive(Clone)]
pub struct PaymentGatewayClient {
    client: reqwest::Client,
    base_url: String,
}

impl PaymentGatewayClient {
    pub fn new(base_url: &str, secret_key: &str) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", secret_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value)
                .map_err(|e| GatewayError::Config(format!("invalid secret key: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a hosted checkout session and return its id and redirect URL.
    #[instrument(skip(self, request), fields(line_count = request.line_items.len()))]
    pub async fn create_checkout_session(
        &self,
        request: &CreateCheckoutSessionRequest,
    ) -> Result<GatewaySession, GatewayError> {
        let url = format!("{}/v1/checkout/sessions", self.base_url);
        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_request() -> CreateCheckoutSessionRequest {
        CreateCheckoutSessionRequest {
            mode: "payment".to_string(),
            line_items: vec![SessionLineItem {
                currency: "usd".to_string(),
                product_name: "Desk Lamp".to_string(),
                unit_amount: 3999,
                quantity: 2,
            }],
            success_url: "http://localhost:3000/order-placed?session_id={CHECKOUT_SESSION_ID}"
                .to_string(),
            cancel_url: "http://localhost:3000/cart".to_string(),
            metadata: HashMap::from([("user_id".to_string(), "user_1".to_string())]),
        }
    }

    #[tokio::test]
    async fn create_checkout_session_parses_provider_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(header("authorization", "Bearer sk_test_123"))
            .and(body_partial_json(json!({
                "mode": "payment",
                "line_items": [{"currency": "usd", "unit_amount": 3999, "quantity": 2}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_abc",
                "url": "https://pay.example.com/cs_test_abc",
                "metadata": {"user_id": "user_1"}
            })))
            .mount(&server)
            .await;

        let client = PaymentGatewayClient::new(&server.uri(), "sk_test_123").unwrap();
        let session = client
            .create_checkout_session(&session_request())
            .await
            .unwrap();

        assert_eq!(session.id, "cs_test_abc");
        assert_eq!(
            session.url.as_ref().map(Url::as_str),
            Some("https://pay.example.com/cs_test_abc")
        );
        assert_eq!(session.metadata.get("user_id").map(String::as_str), Some("user_1"));
    }

    #[tokio::test]
    async fn provider_error_is_surfaced_with_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .respond_with(ResponseTemplate::new(402).set_body_string("card declined"))
            .mount(&server)
            .await;

        let client = PaymentGatewayClient::new(&server.uri(), "sk_test_123").unwrap();
        let err = client
            .create_checkout_session(&session_request())
            .await
            .unwrap_err();

        match err {
            GatewayError::Api { status, message } => {
                assert_eq!(status, 402);
                assert_eq!(message, "card declined");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn webhook_event_envelope_deserializes() {
        let raw = json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {
                "object": {
                    "id": "cs_test_abc",
                    "metadata": {"user_id": "user_1", "address_id": "a"}
                }
            }
        });

        let event: GatewayEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.event_type, CHECKOUT_SESSION_COMPLETED);
        assert_eq!(event.data.object.id, "cs_test_abc");
        assert!(event.data.object.url.is_none());
    }
}
