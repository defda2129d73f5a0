use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::entities::storefront_user::{self, Entity as StorefrontUser};
use crate::errors::ServiceError;
use crate::services::pricing::CartLine;

/// Persists the client-held cart snapshot on the principal's user row. The
/// snapshot is input to checkout, never an order of record: checkout re-prices
/// it against the catalog.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Replace the stored snapshot. Lines with non-positive quantities are
    /// removed rather than stored.
    #[instrument(skip(self, lines), fields(user_id = %user_id, line_count = lines.len()))]
    pub async fn save_cart(
        &self,
        user_id: &str,
        lines: Vec<CartLine>,
    ) -> Result<Vec<CartLine>, ServiceError> {
        let sanitized = sanitize_cart(lines);
        let items = serde_json::to_value(&sanitized)?;

        let model = storefront_user::ActiveModel {
            id: Set(user_id.to_string()),
            cart_items: Set(items),
            updated_at: Set(Utc::now()),
        };

        StorefrontUser::insert(model)
            .on_conflict(
                OnConflict::column(storefront_user::Column::Id)
                    .update_columns([
                        storefront_user::Column::CartItems,
                        storefront_user::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&*self.db)
            .await?;

        info!(line_count = sanitized.len(), "cart snapshot saved");
        Ok(sanitized)
    }

    /// Return the stored snapshot, or an empty cart for principals that never
    /// saved one.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_cart(&self, user_id: &str) -> Result<Vec<CartLine>, ServiceError> {
        let row = StorefrontUser::find_by_id(user_id.to_string())
            .one(&*self.db)
            .await?;

        match row {
            Some(user) => {
                let lines: Vec<CartLine> = serde_json::from_value(user.cart_items)?;
                Ok(lines)
            }
            None => Ok(Vec::new()),
        }
    }
}

/// A zero or negative quantity removes the line.
fn sanitize_cart(lines: Vec<CartLine>) -> Vec<CartLine> {
    lines.into_iter().filter(|line| line.quantity > 0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn sanitize_drops_non_positive_quantities() {
        let keep = Uuid::new_v4();
        let lines = vec![
            CartLine {
                product_id: keep,
                quantity: 2,
            },
            CartLine {
                product_id: Uuid::new_v4(),
                quantity: 0,
            },
            CartLine {
                product_id: Uuid::new_v4(),
                quantity: -1,
            },
        ];

        let sanitized = sanitize_cart(lines);
        assert_eq!(sanitized.len(), 1);
        assert_eq!(sanitized[0].product_id, keep);
    }

    #[test]
    fn sanitized_cart_round_trips_through_json() {
        let lines = vec![CartLine {
            product_id: Uuid::new_v4(),
            quantity: 3,
        }];
        let value = serde_json::to_value(&lines).unwrap();
        let back: Vec<CartLine> = serde_json::from_value(value).unwrap();
        assert_eq!(back, lines);
    }
}
