//! Payment-session bridge for the deferred-payment path.
//!
//! Session creation puts the cart, owner and address into provider metadata;
//! the completion webhook hands the metadata back and the order is derived
//! entirely server-side from it — current catalog prices, not whatever the
//! session was created with.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use url::Url;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::order::{PaymentMethod, PaymentStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::addresses::AddressService;
use crate::services::orders::{MaterializeOrder, OrderResponse, OrderService};
use crate::services::payment_gateway::{
    CreateCheckoutSessionRequest, GatewaySession, PaymentGatewayClient,
};
use crate::services::pricing::{to_session_line_items, CartLine, PricingService};

/// Hosted checkout creation input; mirrors the COD path minus payment.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateSessionInput {
    pub items: Vec<CartLine>,
    pub address_id: Uuid,
}

/// What the UI needs to redirect the buyer.
#[derive(Debug, Clone)]
pub struct HostedCheckout {
    pub session_id: String,
    pub url: Url,
}

/// The state we stash in provider metadata at session creation and read back
/// on the completion webhook.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionMetadata {
    pub user_id: String,
    pub email: String,
    pub address_id: Uuid,
    pub items: Vec<CartLine>,
}

impl SessionMetadata {
    const USER_ID: &'static str = "user_id";
    const EMAIL: &'static str = "email";
    const ADDRESS_ID: &'static str = "address_id";
    const ITEMS: &'static str = "items";

    pub fn to_map(&self) -> Result<HashMap<String, String>, ServiceError> {
        let items = serde_json::to_string(&self.items)?;
        Ok(HashMap::from([
            (Self::USER_ID.to_string(), self.user_id.clone()),
            (Self::EMAIL.to_string(), self.email.clone()),
            (Self::ADDRESS_ID.to_string(), self.address_id.to_string()),
            (Self::ITEMS.to_string(), items),
        ]))
    }

    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, ServiceError> {
        let get = |key: &str| {
            map.get(key).cloned().ok_or_else(|| {
                ServiceError::Validation(format!("session metadata missing '{key}'"))
            })
        };

        let address_id = get(Self::ADDRESS_ID)?.parse::<Uuid>().map_err(|e| {
            ServiceError::Validation(format!("session metadata has invalid address id: {e}"))
        })?;
        let items: Vec<CartLine> = serde_json::from_str(&get(Self::ITEMS)?).map_err(|e| {
            ServiceError::Validation(format!("session metadata has invalid cart: {e}"))
        })?;

        Ok(Self {
            user_id: get(Self::USER_ID)?,
            email: get(Self::EMAIL)?,
            address_id,
            items,
        })
    }
}

#[derive(Clone)]
pub struct CheckoutService {
    pricing: Arc<PricingService>,
    addresses: Arc<AddressService>,
    orders: Arc<OrderService>,
    gateway: Arc<PaymentGatewayClient>,
    event_sender: EventSender,
    app_base_url: String,
    currency: String,
}

impl CheckoutService {
    pub fn new(
        pricing: Arc<PricingService>,
        addresses: Arc<AddressService>,
        orders: Arc<OrderService>,
        gateway: Arc<PaymentGatewayClient>,
        event_sender: EventSender,
        app_base_url: String,
        currency: String,
    ) -> Self {
        Self {
            pricing,
            addresses,
            orders,
            gateway,
            event_sender,
            app_base_url,
            currency,
        }
    }

    /// Create a hosted payment session for the given cart. No order exists
    /// until the provider reports completion.
    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn create_session(
        &self,
        user_id: &str,
        email: &str,
        input: CreateSessionInput,
    ) -> Result<HostedCheckout, ServiceError> {
        let address = self.addresses.get_owned(input.address_id, user_id).await?;
        let lines = self.pricing.resolve(&input.items).await?;
        let line_items = to_session_line_items(&lines, &self.currency)?;

        let metadata = SessionMetadata {
            user_id: user_id.to_string(),
            email: email.to_string(),
            address_id: address.id,
            items: input.items,
        };

        let request = CreateCheckoutSessionRequest {
            mode: "payment".to_string(),
            line_items,
            success_url: format!(
                "{}/order-placed?session_id={{CHECKOUT_SESSION_ID}}",
                self.app_base_url
            ),
            cancel_url: format!("{}/cart", self.app_base_url),
            metadata: metadata.to_map()?,
        };

        let session = self.gateway.create_checkout_session(&request).await?;
        let url = session.url.clone().ok_or_else(|| {
            ServiceError::PaymentProvider("session response missing redirect url".to_string())
        })?;

        info!(session_id = %session.id, "hosted payment session created");

        if let Err(e) = self
            .event_sender
            .send(Event::CheckoutSessionCreated {
                session_id: session.id.clone(),
            })
            .await
        {
            warn!(session_id = %session.id, error = %e, "failed to send session created event");
        }

        Ok(HostedCheckout {
            session_id: session.id,
            url,
        })
    }

    /// Reconcile a verified completion event into an order.
    ///
    /// Pricing is re-run against the current catalog — nothing the buyer or
    /// the original session carried is trusted for amounts. Redelivered
    /// events find the existing row (either here or on the unique index
    /// inside the materializer) and change nothing.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub async fn reconcile_completed_session(
        &self,
        session: GatewaySession,
    ) -> Result<(OrderResponse, bool), ServiceError> {
        if let Some(existing) = self.orders.find_by_session_id(&session.id).await? {
            info!(session_id = %session.id, order_id = %existing.id, "completion event redelivered; order already exists");
            return Ok((OrderResponse::from_model(existing)?, false));
        }

        let metadata = SessionMetadata::from_map(&session.metadata)?;
        let address = self
            .addresses
            .get_owned(metadata.address_id, &metadata.user_id)
            .await?;
        let lines = self.pricing.resolve(&metadata.items).await?;

        let (model, created) = self
            .orders
            .materialize(MaterializeOrder {
                user_id: metadata.user_id,
                email: metadata.email,
                lines,
                address,
                payment_method: PaymentMethod::HostedPayment,
                payment_status: PaymentStatus::Paid,
                payment_session_id: Some(session.id.clone()),
            })
            .await?;

        if let Err(e) = self
            .event_sender
            .send(Event::PaymentSessionReconciled {
                session_id: session.id.clone(),
                order_id: model.id,
            })
            .await
        {
            warn!(session_id = %session.id, error = %e, "failed to send reconciled event");
        }

        Ok((OrderResponse::from_model(model)?, created))
    }
}
