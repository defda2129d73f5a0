use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog product. Checkout logic only reads this table; ownership of the
/// catalog lives elsewhere.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub price: Decimal,
    #[sea_orm(nullable)]
    pub offer_price: Option<Decimal>,
    /// Legacy field: may hold a plain URL string, a JSON-encoded string, an
    /// array of URLs or an object with a `url`/`src` key. Normalized once at
    /// order materialization, never per call site.
    #[sea_orm(column_type = "Json", nullable)]
    pub image: Option<Json>,
    #[sea_orm(nullable)]
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Authoritative unit price: the discounted price when present, the list
    /// price otherwise.
    pub fn unit_price(&self) -> Decimal {
        self.offer_price.unwrap_or(self.price)
    }
}
