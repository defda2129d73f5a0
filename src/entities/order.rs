use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Order delivery lifecycle. Transitions are forward-only.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[sea_orm(string_value = "placed")]
    Placed,
    #[sea_orm(string_value = "delivered")]
    Delivered,
}

impl DeliveryStatus {
    /// Placed → Delivered is the only legal transition; everything else,
    /// including Delivered → Placed, is rejected.
    pub fn can_transition_to(self, next: DeliveryStatus) -> bool {
        matches!(
            (self, next),
            (DeliveryStatus::Placed, DeliveryStatus::Delivered)
        )
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "cod")]
    CashOnDelivery,
    #[sea_orm(string_value = "hosted_payment")]
    HostedPayment,
}

/// Payment collection state, driven only by confirmed payment events — never
/// by delivery timing.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "paid")]
    Paid,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub email: String,
    /// Resolved line items (`Vec<ResolvedLineItem>`), snapshotted at
    /// materialization time
    #[sea_orm(column_type = "Json")]
    pub items: Json,
    /// Always server-computed as Σ(unit price × quantity); never taken from
    /// client input
    pub amount: Decimal,
    pub address_id: Uuid,
    /// `AddressSnapshot` captured when the order was materialized
    #[sea_orm(column_type = "Json")]
    pub shipping_address: Json,
    pub status: DeliveryStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    /// Hosted payment session id; present only for `HostedPayment` orders and
    /// unique, which is what makes webhook reconciliation exactly-once
    #[sea_orm(nullable, unique)]
    pub payment_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_status_only_moves_forward() {
        assert!(DeliveryStatus::Placed.can_transition_to(DeliveryStatus::Delivered));
        assert!(!DeliveryStatus::Delivered.can_transition_to(DeliveryStatus::Placed));
        assert!(!DeliveryStatus::Placed.can_transition_to(DeliveryStatus::Placed));
        assert!(!DeliveryStatus::Delivered.can_transition_to(DeliveryStatus::Delivered));
    }

    #[test]
    fn status_enums_serialize_as_snake_case() {
        assert_eq!(
            serde_json::to_value(DeliveryStatus::Placed).unwrap(),
            serde_json::json!("placed")
        );
        assert_eq!(
            serde_json::to_value(PaymentMethod::CashOnDelivery).unwrap(),
            serde_json::json!("cash_on_delivery")
        );
        assert_eq!(
            serde_json::to_value(PaymentStatus::Paid).unwrap(),
            serde_json::json!("paid")
        );
    }
}
