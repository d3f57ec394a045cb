use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::location::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    Delivery,
    Pickup,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Received,
    Preparing,
    Ready,
    OnTheWay,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Received => "received",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::OnTheWay => "on_the_way",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub delivery_type: DeliveryType,
    pub delivery_address: Option<String>,
    /// Stored destination; absent when the customer only typed an address.
    pub destination: Option<GeoPoint>,
    pub subtotal: i64,
    pub delivery_fee: i64,
    pub is_free_delivery: bool,
    pub distance_km: Option<f64>,
    pub total: i64,
    pub status: OrderStatus,
    pub pickup_code: Option<u16>,
    pub delivery_code: Option<u16>,
    pub code_attempts: u32,
    pub delivery_user_id: Option<Uuid>,
    /// Minutes, set when the kitchen starts preparing.
    pub estimated_ready_time: Option<u32>,
    pub started_delivery_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// The code for this order's handoff leg.
    pub fn confirmation_code(&self) -> Option<u16> {
        match self.delivery_type {
            DeliveryType::Delivery => self.delivery_code,
            DeliveryType::Pickup => self.pickup_code,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub delivery_user_id: Option<Uuid>,
    pub at: DateTime<Utc>,
}
