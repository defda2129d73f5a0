pub mod addresses;
pub mod carts;
pub mod checkout;
pub mod common;
pub mod orders;
pub mod payment_webhooks;
pub mod products;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::services::pricing::LinePolicy;
use crate::services::{
    AddressService, CartService, CatalogService, CheckoutService, MailerClient, OrderService,
    PaymentGatewayClient, PricingService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers.
/// Everything is constructed here, explicitly, from configuration — no client
/// is created at module load or captured from ambient scope.
#[derive(Clone)]
pub struct AppServices {
    pub addresses: Arc<AddressService>,
    pub carts: Arc<CartService>,
    pub catalog: Arc<CatalogService>,
    pub orders: Arc<OrderService>,
    pub checkout: Arc<CheckoutService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        config: &AppConfig,
    ) -> anyhow::Result<Self> {
        let policy: LinePolicy = config
            .checkout_line_policy
            .parse()
            .map_err(anyhow::Error::msg)?;

        let pricing = Arc::new(PricingService::new(db.clone(), policy));
        let addresses = Arc::new(AddressService::new(db.clone()));
        let carts = Arc::new(CartService::new(db.clone()));
        let catalog = Arc::new(CatalogService::new(db.clone()));

        let mailer = Arc::new(MailerClient::new(
            &config.email_api_url,
            &config.email_api_key,
            &config.email_from,
        )?);
        let gateway = Arc::new(PaymentGatewayClient::new(
            &config.payment_gateway_url,
            &config.payment_gateway_secret_key,
        )?);

        let orders = Arc::new(OrderService::new(
            db,
            event_sender.clone(),
            pricing.clone(),
            addresses.clone(),
            mailer,
            config.store_name.clone(),
        ));
        let checkout = Arc::new(CheckoutService::new(
            pricing,
            addresses.clone(),
            orders.clone(),
            gateway,
            event_sender,
            config.app_base_url.clone(),
            config.currency.clone(),
        ));

        Ok(Self {
            addresses,
            carts,
            catalog,
            orders,
            checkout,
        })
    }
}
