use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::address::{self, Entity as Address};
use crate::errors::ServiceError;

/// Input for creating an address; field validation happens at the handler
/// boundary, ownership is stamped here.
#[derive(Debug, Clone)]
pub struct NewAddress {
    pub full_name: String,
    pub phone_number: String,
    pub pincode: String,
    pub area: String,
    pub city: String,
    pub state: String,
}

/// Owner-scoped address store. Every query is filtered by the principal id;
/// there is no path that reads another principal's rows.
#[derive(Clone)]
pub struct AddressService {
    db: Arc<DatabaseConnection>,
}

impl AddressService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn create_address(
        &self,
        user_id: &str,
        input: NewAddress,
    ) -> Result<address::Model, ServiceError> {
        let model = address::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id.to_string()),
            full_name: Set(input.full_name),
            phone_number: Set(input.phone_number),
            pincode: Set(input.pincode),
            area: Set(input.area),
            city: Set(input.city),
            state: Set(input.state),
            created_at: Set(Utc::now()),
        };

        let address = model.insert(&*self.db).await?;
        info!(address_id = %address.id, "address created");
        Ok(address)
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_addresses(&self, user_id: &str) -> Result<Vec<address::Model>, ServiceError> {
        let addresses = Address::find()
            .filter(address::Column::UserId.eq(user_id))
            .order_by_desc(address::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(addresses)
    }

    /// Fetch an address only if it belongs to the given principal. Used by
    /// both checkout paths; a miss is terminal for the checkout.
    #[instrument(skip(self), fields(address_id = %address_id, user_id = %user_id))]
    pub async fn get_owned(
        &self,
        address_id: Uuid,
        user_id: &str,
    ) -> Result<address::Model, ServiceError> {
        Address::find_by_id(address_id)
            .filter(address::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Address not found".to_string()))
    }
}
