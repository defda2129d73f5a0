use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Delivery address owned by an authenticated principal
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "addresses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Principal id issued by the external identity provider
    pub user_id: String,
    pub full_name: String,
    pub phone_number: String,
    pub pincode: String,
    pub area: String,
    pub city: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Copy of the address fields embedded into an order at materialization time.
/// Orders keep this snapshot rather than re-joining the live row, so editing
/// an address never rewrites order history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AddressSnapshot {
    pub id: Uuid,
    pub full_name: String,
    pub phone_number: String,
    pub pincode: String,
    pub area: String,
    pub city: String,
    pub state: String,
}

impl From<&Model> for AddressSnapshot {
    fn from(model: &Model) -> Self {
        Self {
            id: model.id,
            full_name: model.full_name.clone(),
            phone_number: model.phone_number.clone(),
            pincode: model.pincode.clone(),
            area: model.area.clone(),
            city: model.city.clone(),
            state: model.state.clone(),
        }
    }
}
