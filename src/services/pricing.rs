//! Pricing resolution and line-item building.
//!
//! Both checkout paths — cash-on-delivery and hosted payment — price a cart
//! exclusively from the catalog. Client-submitted amounts are never trusted;
//! the hosted-payment webhook re-runs the same resolution here against the
//! current catalog before an order is materialized.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{instrument, warn};
use url::Url;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::product;
use crate::errors::ServiceError;

/// What to do with cart lines that reference a product the catalog does not
/// know: drop them (and log) or fail the whole checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinePolicy {
    Lenient,
    Strict,
}

impl FromStr for LinePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lenient" => Ok(LinePolicy::Lenient),
            "strict" => Ok(LinePolicy::Strict),
            other => Err(format!("unknown checkout line policy: {other}")),
        }
    }
}

/// One entry of a client-held cart snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// A cart line resolved against the catalog. This is also the exact shape
/// stored in an order's `items` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResolvedLineItem {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub image_url: Option<Url>,
}

impl ResolvedLineItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    /// Unit price in minor units (cents), rounded half-up. Deterministic and
    /// shared between session creation and reconciliation, since the provider
    /// settles in minor units.
    pub fn unit_amount_minor(&self) -> Result<i64, ServiceError> {
        (self.unit_price * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or_else(|| {
                ServiceError::InvalidOperation(format!(
                    "unit price {} out of range for minor-unit conversion",
                    self.unit_price
                ))
            })
    }
}

/// Line item in the shape the hosted payment session API expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLineItem {
    pub currency: String,
    pub product_name: String,
    pub unit_amount: i64,
    pub quantity: i32,
}

/// Sum of line totals; the only way an order amount is ever computed.
pub fn order_total(lines: &[ResolvedLineItem]) -> Decimal {
    lines.iter().map(ResolvedLineItem::line_total).sum()
}

/// Convert resolved lines into the hosted-session shape.
pub fn to_session_line_items(
    lines: &[ResolvedLineItem],
    currency: &str,
) -> Result<Vec<SessionLineItem>, ServiceError> {
    lines
        .iter()
        .map(|line| {
            Ok(SessionLineItem {
                currency: currency.to_string(),
                product_name: line.name.clone(),
                unit_amount: line.unit_amount_minor()?,
                quantity: line.quantity,
            })
        })
        .collect()
}

/// Resolves cart lines to authoritative prices by reading the catalog.
#[derive(Clone)]
pub struct PricingService {
    db: Arc<DatabaseConnection>,
    policy: LinePolicy,
}

impl PricingService {
    pub fn new(db: Arc<DatabaseConnection>, policy: LinePolicy) -> Self {
        Self { db, policy }
    }

    /// Resolve `(product id, quantity)` pairs against the catalog.
    ///
    /// Lines with non-positive quantities are removed up front. Unknown
    /// products are dropped (lenient) or rejected (strict). An empty
    /// surviving set is terminal: the caller must not create an order or a
    /// payment session from it.
    #[instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn resolve(&self, lines: &[CartLine]) -> Result<Vec<ResolvedLineItem>, ServiceError> {
        let wanted: Vec<CartLine> = lines
            .iter()
            .filter(|line| line.quantity > 0)
            .cloned()
            .collect();

        if wanted.is_empty() {
            return Err(ServiceError::InvalidOperation(
                "no valid items in cart".to_string(),
            ));
        }

        let ids: Vec<Uuid> = wanted.iter().map(|line| line.product_id).collect();
        let products: HashMap<Uuid, product::Model> = product::Entity::find()
            .filter(product::Column::Id.is_in(ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        resolve_against(&products, &wanted, self.policy)
    }
}

/// Pure resolution step, split out from the catalog read.
fn resolve_against(
    products: &HashMap<Uuid, product::Model>,
    lines: &[CartLine],
    policy: LinePolicy,
) -> Result<Vec<ResolvedLineItem>, ServiceError> {
    let mut resolved = Vec::with_capacity(lines.len());

    for line in lines {
        match products.get(&line.product_id) {
            Some(product) => resolved.push(ResolvedLineItem {
                product_id: product.id,
                name: product.name.clone(),
                unit_price: product.unit_price(),
                quantity: line.quantity,
                image_url: normalize_image(product.image.as_ref()),
            }),
            None => match policy {
                LinePolicy::Lenient => {
                    warn!(product_id = %line.product_id, "dropping cart line for unknown product");
                }
                LinePolicy::Strict => {
                    return Err(ServiceError::Validation(format!(
                        "unknown product in cart: {}",
                        line.product_id
                    )));
                }
            },
        }
    }

    if resolved.is_empty() {
        return Err(ServiceError::InvalidOperation(
            "no valid items in cart".to_string(),
        ));
    }

    Ok(resolved)
}

/// Normalize the legacy product image field into a URL.
///
/// Seed data left this column in four shapes: a plain URL string, a
/// JSON-encoded string or array, an array of URLs, or an object with a
/// `url`/`src` key. One tagged parse here replaces the ad-hoc branching that
/// used to live at every call site.
pub fn normalize_image(value: Option<&serde_json::Value>) -> Option<Url> {
    use serde_json::Value;

    let raw = match value? {
        Value::Null => return None,
        Value::String(s) => normalize_image_string(s)?,
        Value::Array(items) => items.first()?.as_str()?.to_string(),
        Value::Object(map) => map
            .get("url")
            .or_else(|| map.get("src"))?
            .as_str()?
            .to_string(),
        _ => return None,
    };

    Url::parse(raw.trim()).ok()
}

fn normalize_image_string(s: &str) -> Option<String> {
    use serde_json::Value;

    match serde_json::from_str::<Value>(s) {
        Ok(Value::Array(items)) => items.first()?.as_str().map(str::to_string),
        Ok(Value::String(inner)) => Some(inner),
        // Not JSON: strip the bracket/quote noise some rows carry.
        _ => Some(
            s.chars()
                .filter(|c| !matches!(c, '[' | ']' | '\''))
                .collect::<String>()
                .trim()
                .to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use test_case::test_case;

    fn product(id: Uuid, name: &str, price: Decimal, offer: Option<Decimal>) -> product::Model {
        product::Model {
            id,
            name: name.to_string(),
            description: String::new(),
            price,
            offer_price: offer,
            image: None,
            category: None,
            created_at: Utc::now(),
        }
    }

    fn catalog(products: Vec<product::Model>) -> HashMap<Uuid, product::Model> {
        products.into_iter().map(|p| (p.id, p)).collect()
    }

    #[test]
    fn resolves_offer_price_over_list_price() {
        let id = Uuid::new_v4();
        let products = catalog(vec![product(id, "Lamp", dec!(50.00), Some(dec!(39.99)))]);
        let lines = vec![CartLine {
            product_id: id,
            quantity: 1,
        }];

        let resolved = resolve_against(&products, &lines, LinePolicy::Lenient).unwrap();
        assert_eq!(resolved[0].unit_price, dec!(39.99));
    }

    #[test]
    fn lenient_policy_drops_unknown_product_and_keeps_valid_line() {
        let id = Uuid::new_v4();
        let products = catalog(vec![product(id, "Mug", dec!(10.00), None)]);
        let lines = vec![
            CartLine {
                product_id: Uuid::new_v4(),
                quantity: 1,
            },
            CartLine {
                product_id: id,
                quantity: 2,
            },
        ];

        let resolved = resolve_against(&products, &lines, LinePolicy::Lenient).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].quantity, 2);
        assert_eq!(resolved[0].unit_price, dec!(10.00));
        assert_eq!(resolved[0].line_total(), dec!(20.00));
        assert_eq!(order_total(&resolved), dec!(20.00));
    }

    #[test]
    fn strict_policy_rejects_unknown_product() {
        let id = Uuid::new_v4();
        let products = catalog(vec![product(id, "Mug", dec!(10.00), None)]);
        let lines = vec![
            CartLine {
                product_id: Uuid::new_v4(),
                quantity: 1,
            },
            CartLine {
                product_id: id,
                quantity: 2,
            },
        ];

        let err = resolve_against(&products, &lines, LinePolicy::Strict).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn only_unknown_products_is_terminal() {
        let products = catalog(vec![]);
        let lines = vec![CartLine {
            product_id: Uuid::new_v4(),
            quantity: 1,
        }];

        let err = resolve_against(&products, &lines, LinePolicy::Lenient).unwrap_err();
        match err {
            ServiceError::InvalidOperation(msg) => assert!(msg.contains("no valid items")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_positive_quantities_are_removed() {
        let id = Uuid::new_v4();
        let products = catalog(vec![product(id, "Mug", dec!(10.00), None)]);
        let lines = vec![
            CartLine {
                product_id: id,
                quantity: 0,
            },
            CartLine {
                product_id: id,
                quantity: -3,
            },
        ];
        // After dropping non-positive quantities nothing survives.
        let kept: Vec<CartLine> = lines.into_iter().filter(|l| l.quantity > 0).collect();
        assert!(kept.is_empty());

        let err = resolve_against(&products, &kept, LinePolicy::Lenient);
        // resolve() short-circuits before this point, but the pure step agrees.
        assert!(err.is_err());
    }

    #[test_case(dec!(10.00), 1000 ; "whole dollars")]
    #[test_case(dec!(79.99), 7999 ; "cents preserved")]
    #[test_case(dec!(0.005), 1 ; "half cent rounds up")]
    #[test_case(dec!(10.994), 1099 ; "below midpoint rounds down")]
    #[test_case(dec!(10.995), 1100 ; "midpoint rounds up")]
    fn minor_unit_conversion_rounds_half_up(unit_price: Decimal, expected: i64) {
        let line = ResolvedLineItem {
            product_id: Uuid::new_v4(),
            name: "x".to_string(),
            unit_price,
            quantity: 1,
            image_url: None,
        };
        assert_eq!(line.unit_amount_minor().unwrap(), expected);
    }

    #[test]
    fn session_line_items_carry_currency_and_minor_units() {
        let lines = vec![ResolvedLineItem {
            product_id: Uuid::new_v4(),
            name: "Desk Lamp".to_string(),
            unit_price: dec!(39.99),
            quantity: 2,
            image_url: None,
        }];

        let items = to_session_line_items(&lines, "usd").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].currency, "usd");
        assert_eq!(items[0].product_name, "Desk Lamp");
        assert_eq!(items[0].unit_amount, 3999);
        assert_eq!(items[0].quantity, 2);
    }

    #[test]
    fn line_policy_parses_from_config_strings() {
        assert_eq!("lenient".parse::<LinePolicy>().unwrap(), LinePolicy::Lenient);
        assert_eq!("strict".parse::<LinePolicy>().unwrap(), LinePolicy::Strict);
        assert!("best-effort".parse::<LinePolicy>().is_err());
    }

    #[test_case(json!(null), None ; "null")]
    #[test_case(json!("https://cdn.example.com/a.png"), Some("https://cdn.example.com/a.png") ; "plain string")]
    #[test_case(json!("[\"https://cdn.example.com/a.png\",\"https://cdn.example.com/b.png\"]"), Some("https://cdn.example.com/a.png") ; "json encoded array string")]
    #[test_case(json!("\"https://cdn.example.com/a.png\""), Some("https://cdn.example.com/a.png") ; "json encoded string")]
    #[test_case(json!("['https://cdn.example.com/a.png']"), Some("https://cdn.example.com/a.png") ; "bracket noised string")]
    #[test_case(json!(["https://cdn.example.com/a.png", "https://cdn.example.com/b.png"]), Some("https://cdn.example.com/a.png") ; "array takes first")]
    #[test_case(json!({"url": "https://cdn.example.com/a.png"}), Some("https://cdn.example.com/a.png") ; "object url key")]
    #[test_case(json!({"src": "https://cdn.example.com/a.png"}), Some("https://cdn.example.com/a.png") ; "object src key")]
    #[test_case(json!({"other": "x"}), None ; "object without url")]
    #[test_case(json!("not a url"), None ; "unparseable string")]
    #[test_case(json!(42), None ; "number")]
    fn image_normalization_cases(value: serde_json::Value, expected: Option<&str>) {
        let normalized = normalize_image(Some(&value));
        assert_eq!(normalized.as_ref().map(Url::as_str), expected);
    }

    #[test]
    fn missing_image_field_normalizes_to_none() {
        assert_eq!(normalize_image(None), None);
    }
}
