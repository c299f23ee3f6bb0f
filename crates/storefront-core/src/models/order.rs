use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::{de_price, Product};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    #[serde(default)]
    pub id: Option<i64>,
    pub product: Product,
    pub quantity: u32,
    #[serde(deserialize_with = "de_price")]
    pub price: f64,
}

impl OrderItem {
    pub fn line_total(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

/// The user an order belongs to, as embedded by the admin views
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderOwner {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: i64,
    pub code: String,
    #[serde(default)]
    pub user: Option<OrderOwner>,
    pub status: OrderStatus,
    #[serde(default)]
    pub status_display: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "de_price")]
    pub total_price: f64,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub cancel_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub quantity: u32,
}

/// Body for `POST orders/`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewOrder {
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Body for `PATCH orders/{code}/`. Only these two fields may change.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
}
