use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::address::{self, AddressSnapshot};
use crate::entities::order::{self, DeliveryStatus, Entity as Order, PaymentMethod, PaymentStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::addresses::AddressService;
use crate::services::email::MailerClient;
use crate::services::pricing::{order_total, CartLine, PricingService, ResolvedLineItem};

/// Orders auto-promote to delivered once this many days have elapsed since
/// creation. The transition is lazy: it runs at listing time, not in a
/// background job.
pub const DELIVERY_WINDOW_DAYS: i64 = 4;

/// Cash-on-delivery checkout input. There is deliberately no amount field;
/// totals are always server-computed.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateOrderInput {
    pub items: Vec<CartLine>,
    pub address_id: Uuid,
}

/// Everything the materializer needs to write exactly one order row.
#[derive(Debug, Clone)]
pub struct MaterializeOrder {
    pub user_id: String,
    pub email: String,
    pub lines: Vec<ResolvedLineItem>,
    pub address: address::Model,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    /// Hosted payment session id; its unique index is what makes redelivered
    /// completion events idempotent
    pub payment_session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub email: String,
    pub items: Vec<ResolvedLineItem>,
    pub amount: Decimal,
    pub address_id: Uuid,
    pub shipping_address: AddressSnapshot,
    pub status: DeliveryStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OrderResponse {
    pub fn from_model(model: order::Model) -> Result<Self, ServiceError> {
        let items: Vec<ResolvedLineItem> = serde_json::from_value(model.items)?;
        let shipping_address: AddressSnapshot = serde_json::from_value(model.shipping_address)?;
        Ok(Self {
            id: model.id,
            email: model.email,
            items,
            amount: model.amount,
            address_id: model.address_id,
            shipping_address,
            status: model.status,
            payment_method: model.payment_method,
            payment_status: model.payment_status,
            payment_session_id: model.payment_session_id,
            created_at: model.created_at,
        })
    }
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    pricing: Arc<PricingService>,
    addresses: Arc<AddressService>,
    mailer: Arc<MailerClient>,
    store_name: String,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        pricing: Arc<PricingService>,
        addresses: Arc<AddressService>,
        mailer: Arc<MailerClient>,
        store_name: String,
    ) -> Self {
        Self {
            db,
            event_sender,
            pricing,
            addresses,
            mailer,
            store_name,
        }
    }

    /// Cash-on-delivery checkout: resolve the cart against the catalog and
    /// materialize a Placed / Pending order.
    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn create_cod_order(
        &self,
        user_id: &str,
        email: &str,
        input: CreateOrderInput,
    ) -> Result<OrderResponse, ServiceError> {
        let address = self.addresses.get_owned(input.address_id, user_id).await?;
        let lines = self.pricing.resolve(&input.items).await?;

        let (model, _created) = self
            .materialize(MaterializeOrder {
                user_id: user_id.to_string(),
                email: email.to_string(),
                lines,
                address,
                payment_method: PaymentMethod::CashOnDelivery,
                payment_status: PaymentStatus::Pending,
                payment_session_id: None,
            })
            .await?;

        OrderResponse::from_model(model)
    }

    /// Insert exactly one order row. The amount is recomputed here from the
    /// resolved lines — a client-supplied total never reaches this point.
    ///
    /// Returns the persisted row and whether this call created it. When a
    /// payment session id is attached and another request already inserted a
    /// row for it, the unique index fires and the existing row is returned
    /// instead — that is the webhook-redelivery path.
    #[instrument(skip(self, input), fields(user_id = %input.user_id, payment_method = ?input.payment_method))]
    pub async fn materialize(
        &self,
        input: MaterializeOrder,
    ) -> Result<(order::Model, bool), ServiceError> {
        let amount = order_total(&input.lines);
        let snapshot = AddressSnapshot::from(&input.address);
        let order_id = Uuid::new_v4();

        let model = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(input.user_id.clone()),
            email: Set(input.email.clone()),
            items: Set(serde_json::to_value(&input.lines)?),
            amount: Set(amount),
            address_id: Set(input.address.id),
            shipping_address: Set(serde_json::to_value(&snapshot)?),
            status: Set(DeliveryStatus::Placed),
            payment_method: Set(input.payment_method),
            payment_status: Set(input.payment_status),
            payment_session_id: Set(input.payment_session_id.clone()),
            created_at: Set(Utc::now()),
        };

        let order = match model.insert(&*self.db).await {
            Ok(order) => order,
            Err(e) => {
                let unique_violation =
                    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)));
                if unique_violation {
                    if let Some(session_id) = &input.payment_session_id {
                        // Lost the race against a concurrent delivery of the
                        // same completion event; the winner's row is the order.
                        warn!(session_id = %session_id, "order already materialized for session");
                        if let Some(existing) = self.find_by_session_id(session_id).await? {
                            return Ok((existing, false));
                        }
                    }
                }
                error!(order_id = %order_id, "failed to insert order");
                return Err(ServiceError::Database(e));
            }
        };

        info!(order_id = %order.id, amount = %order.amount, "order materialized");

        if let Err(e) = self.event_sender.send(Event::OrderCreated(order.id)).await {
            warn!(order_id = %order.id, error = %e, "failed to send order created event");
        }

        // Confirmation email is best-effort: a failed send is logged and never
        // un-creates the order.
        let message = self.mailer.order_confirmation(
            &self.store_name,
            &order.email,
            &input.lines,
            amount,
            input.payment_method,
            &snapshot,
        );
        if let Err(e) = self.mailer.send(&message).await {
            warn!(order_id = %order.id, error = %e, "order confirmation email failed");
        }

        Ok((order, true))
    }

    pub async fn find_by_session_id(
        &self,
        session_id: &str,
    ) -> Result<Option<order::Model>, ServiceError> {
        let order = Order::find()
            .filter(order::Column::PaymentSessionId.eq(session_id))
            .one(&*self.db)
            .await?;
        Ok(order)
    }

    /// Owner-scoped listing, newest first. Runs the delivery sweeper before
    /// reading so the returned set reflects the promotions it made.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_orders(&self, user_id: &str) -> Result<Vec<OrderResponse>, ServiceError> {
        self.sweep_delivered(user_id, Utc::now()).await?;

        let orders = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        orders.into_iter().map(OrderResponse::from_model).collect()
    }

    /// Promote this owner's stale Placed orders to Delivered in one bulk
    /// update. Payment status is untouched: delivery timing says nothing
    /// about whether money was collected.
    async fn sweep_delivered(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let cutoff = delivery_cutoff(now);

        let stale: Vec<Uuid> = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .filter(order::Column::Status.ne(DeliveryStatus::Delivered))
            .filter(order::Column::CreatedAt.lte(cutoff))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|o| o.id)
            .collect();

        if stale.is_empty() {
            return Ok(());
        }

        Order::update_many()
            .col_expr(
                order::Column::Status,
                Expr::value(DeliveryStatus::Delivered),
            )
            .filter(order::Column::Id.is_in(stale.clone()))
            .exec(&*self.db)
            .await?;

        info!(count = stale.len(), user_id = %user_id, "orders promoted to delivered");

        if let Err(e) = self
            .event_sender
            .send(Event::OrdersDelivered { order_ids: stale })
            .await
        {
            warn!(user_id = %user_id, error = %e, "failed to send orders delivered event");
        }

        Ok(())
    }
}

/// Orders created at or before this instant are due for delivery promotion.
fn delivery_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(DELIVERY_WINDOW_DAYS)
}
