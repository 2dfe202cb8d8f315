use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::utils::time::datetime_ddmmyyyy;

/// BUY acquires YES shares; SELL acquires NO shares at the complementary
/// price. Both are quoted as YES prices in (0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    Pending,
    PartiallyFilled,
    Filled,
    Cancelled,
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderState::Pending => write!(f, "PENDING"),
            OrderState::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            OrderState::Filled => write!(f, "FILLED"),
            OrderState::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub market_id: Uuid,
    pub side: OrderSide,
    pub price: Decimal,
    pub quantity: i64,
    pub filled_quantity: i64,
    pub state: OrderState,
    pub execution_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn remaining(&self) -> i64 {
        self.quantity - self.filled_quantity
    }

    /// Live orders rest in the book and are cancellable.
    pub fn is_live(&self) -> bool {
        matches!(self.state, OrderState::Pending | OrderState::PartiallyFilled)
    }
}

fn validate_price_bounds(price: &Decimal) -> Result<(), ValidationError> {
    if *price <= Decimal::ZERO || *price > Decimal::ONE {
        return Err(ValidationError::new("price_out_of_bounds"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub market_id: Uuid,
    pub side: OrderSide,
    #[validate(custom = "validate_price_bounds")]
    pub price: Decimal,
    #[validate(range(min = 1))]
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub market_id: Uuid,
    pub side: OrderSide,
    pub price: Decimal,
    pub quantity: i64,
    pub filled_quantity: i64,
    pub remaining_quantity: i64,
    pub state: OrderState,
    pub execution_price: Option<Decimal>,
    #[serde(serialize_with = "datetime_ddmmyyyy::serialize")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "datetime_ddmmyyyy::serialize")]
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            market_id: order.market_id,
            side: order.side,
            price: order.price,
            quantity: order.quantity,
            filled_quantity: order.filled_quantity,
            remaining_quantity: order.quantity - order.filled_quantity,
            state: order.state,
            execution_price: order.execution_price,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_create_order_request_wire_format() {
        let json = r#"{"marketId":"7f6b2a9e-4a0f-4e2e-9d8a-0c1b2d3e4f50","side":"BUY","price":0.6,"quantity":100}"#;
        let req: CreateOrderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.side, OrderSide::Buy);
        assert_eq!(req.price, dec!(0.6));
        assert_eq!(req.quantity, 100);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_create_order_request_rejects_bad_bounds() {
        let json = r#"{"marketId":"7f6b2a9e-4a0f-4e2e-9d8a-0c1b2d3e4f50","side":"SELL","price":1.2,"quantity":0}"#;
        let req: CreateOrderRequest = serde_json::from_str(json).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_order_state_wire_names() {
        assert_eq!(
            serde_json::to_string(&OrderState::PartiallyFilled).unwrap(),
            r#""PARTIALLY_FILLED""#
        );
        assert_eq!(
            serde_json::to_string(&OrderSide::Sell).unwrap(),
            r#""SELL""#
        );
    }
}
