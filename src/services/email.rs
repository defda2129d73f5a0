//! Transactional email client.
//!
//! Order confirmations are fire-and-forget: the order service logs a failed
//! send and moves on. Nothing in checkout ever waits on, retries, or rolls
//! back because of email.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::entities::address::AddressSnapshot;
use crate::entities::order::PaymentMethod;
use crate::services::pricing::ResolvedLineItem;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Clone)]
pub struct MailerClient {
    client: reqwest::Client,
    base_url: String,
    from: String,
}

impl MailerClient {
    pub fn new(base_url: &str, api_key: &str, from: &str) -> Result<Self, MailerError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", api_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value)
                .map_err(|e| MailerError::Config(format!("invalid api key: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            from: from.to_string(),
        })
    }

    #[instrument(skip(self, message), fields(to = %message.to, subject = %message.subject))]
    pub async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
        let url = format!("{}/v1/messages", self.base_url);
        let response = self.client.post(&url).json(message).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailerError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(())
    }

    /// Build the order-confirmation message for a freshly materialized order.
    pub fn order_confirmation(
        &self,
        store_name: &str,
        to: &str,
        items: &[ResolvedLineItem],
        amount: Decimal,
        payment_method: PaymentMethod,
        address: &AddressSnapshot,
    ) -> EmailMessage {
        let item_list: String = items
            .iter()
            .map(|item| format!("<li><strong>{}</strong> — Qty: {}</li>", item.name, item.quantity))
            .collect();

        let payment_label = match payment_method {
            PaymentMethod::CashOnDelivery => "Cash on Delivery",
            PaymentMethod::HostedPayment => "Paid Online",
        };

        let html = format!(
            "<h2>Your Order is Confirmed!</h2>\
             <p>Thank you for shopping with {store_name}.</p>\
             <h3>Order Summary:</h3>\
             <ul>{item_list}</ul>\
             <p><strong>Total Amount:</strong> ${amount}</p>\
             <p><strong>Payment Method:</strong> {payment_label}</p>\
             <h3>Delivery Address:</h3>\
             <p>{full_name}<br />{area}<br />{city}, {state}<br />{phone}</p>\
             <p>Estimated Delivery: 4 days</p>",
            store_name = store_name,
            item_list = item_list,
            amount = amount,
            payment_label = payment_label,
            full_name = address.full_name,
            area = address.area,
            city = address.city,
            state = address.state,
            phone = address.phone_number,
        );

        EmailMessage {
            from: self.from.clone(),
            to: to.to_string(),
            subject: format!("Your {store_name} Order Confirmation"),
            html,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn snapshot() -> AddressSnapshot {
        AddressSnapshot {
            id: Uuid::new_v4(),
            full_name: "Asha Patel".to_string(),
            phone_number: "555-0100".to_string(),
            pincode: "400001".to_string(),
            area: "12 Harbor Lane".to_string(),
            city: "Mumbai".to_string(),
            state: "MH".to_string(),
        }
    }

    #[test]
    fn confirmation_email_lists_items_total_and_address() {
        let client = MailerClient::new("https://api.mail.example.com", "key", "orders@example.com")
            .unwrap();
        let items = vec![ResolvedLineItem {
            product_id: Uuid::new_v4(),
            name: "Desk Lamp".to_string(),
            unit_price: dec!(39.99),
            quantity: 2,
            image_url: None,
        }];

        let message = client.order_confirmation(
            "Storefront",
            "shopper@example.com",
            &items,
            dec!(79.98),
            PaymentMethod::CashOnDelivery,
            &snapshot(),
        );

        assert_eq!(message.to, "shopper@example.com");
        assert_eq!(message.subject, "Your Storefront Order Confirmation");
        assert!(message.html.contains("<strong>Desk Lamp</strong> — Qty: 2"));
        assert!(message.html.contains("$79.98"));
        assert!(message.html.contains("Cash on Delivery"));
        assert!(message.html.contains("Asha Patel"));
        assert!(message.html.contains("Mumbai, MH"));
        assert!(message.html.contains("Estimated Delivery: 4 days"));
    }

    #[tokio::test]
    async fn send_posts_message_to_provider() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(body_partial_json(serde_json::json!({
                "to": "shopper@example.com",
                "subject": "hello"
            })))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let client = MailerClient::new(&server.uri(), "key", "orders@example.com").unwrap();
        let message = EmailMessage {
            from: "orders@example.com".to_string(),
            to: "shopper@example.com".to_string(),
            subject: "hello".to_string(),
            html: "<p>hi</p>".to_string(),
        };

        client.send(&message).await.unwrap();
    }

    #[tokio::test]
    async fn failed_send_surfaces_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(500).set_body_string("smtp backend down"))
            .mount(&server)
            .await;

        let client = MailerClient::new(&server.uri(), "key", "orders@example.com").unwrap();
        let message = EmailMessage {
            from: "orders@example.com".to_string(),
            to: "shopper@example.com".to_string(),
            subject: "hello".to_string(),
            html: "<p>hi</p>".to_string(),
        };

        let err = client.send(&message).await.unwrap_err();
        assert_matches::assert_matches!(err, MailerError::Api { status: 500, .. });
    }
}
