// storefront/src/models/order.rs

use crate::models::{CustomerSummary, OrderItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
  Pending,
  Paid,
  Processing,
  Shipped,
  Delivered,
  Completed,
  Cancelled,
  Refunded,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 8] = [
    OrderStatus::Pending,
    OrderStatus::Paid,
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Completed,
    OrderStatus::Cancelled,
    OrderStatus::Refunded,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::Pending => "PENDING",
      OrderStatus::Paid => "PAID",
      OrderStatus::Processing => "PROCESSING",
      OrderStatus::Shipped => "SHIPPED",
      OrderStatus::Delivered => "DELIVERED",
      OrderStatus::Completed => "COMPLETED",
      OrderStatus::Cancelled => "CANCELLED",
      OrderStatus::Refunded => "REFUNDED",
    }
  }

  /// Statuses whose totals count as revenue.
  pub fn counts_as_revenue(self) -> bool {
    matches!(
      self,
      OrderStatus::Paid
        | OrderStatus::Processing
        | OrderStatus::Shipped
        | OrderStatus::Delivered
        | OrderStatus::Completed
    )
  }

  /// Statuses the admin dashboard reports as waiting on the merchant.
  pub fn is_open(self) -> bool {
    matches!(self, OrderStatus::Pending | OrderStatus::Paid | OrderStatus::Processing)
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Statut inconnu: {}", self.0)
  }
}

impl FromStr for OrderStatus {
  type Err = UnknownStatus;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    OrderStatus::ALL
      .into_iter()
      .find(|status| status.as_str() == s)
      .ok_or_else(|| UnknownStatus(s.to_string()))
  }
}

/// Copy of the shipping address taken at checkout. Later edits or deletion
/// of the live address never touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ShippingSnapshot {
  #[sqlx(rename = "shipping_first_name")]
  pub first_name: String,
  #[sqlx(rename = "shipping_last_name")]
  pub last_name: String,
  #[sqlx(rename = "shipping_address1")]
  pub address1: String,
  #[sqlx(rename = "shipping_address2")]
  pub address2: Option<String>,
  #[sqlx(rename = "shipping_city")]
  pub city: String,
  #[sqlx(rename = "shipping_postal_code")]
  pub postal_code: String,
  #[sqlx(rename = "shipping_country")]
  pub country: String,
  #[sqlx(rename = "shipping_phone")]
  pub phone: Option<String>,
}

impl From<&crate::models::Address> for ShippingSnapshot {
  fn from(address: &crate::models::Address) -> Self {
    Self {
      first_name: address.first_name.clone(),
      last_name: address.last_name.clone(),
      address1: address.address1.clone(),
      address2: address.address2.clone(),
      city: address.city.clone(),
      postal_code: address.postal_code.clone(),
      country: address.country.clone(),
      phone: address.phone.clone(),
    }
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  pub order_number: String,
  pub user_id: Option<Uuid>,
  pub status: OrderStatus,
  #[sqlx(flatten)]
  #[serde(rename = "shippingAddress")]
  pub shipping: ShippingSnapshot,
  pub subtotal: i64,
  pub shipping_cost: i64,
  pub discount: i64,
  pub total: i64,
  pub currency: String,
  pub payment_session_id: String,
  pub payment_intent_id: Option<String>,
  pub tracking_number: Option<String>,
  pub tracking_url: Option<String>,
  pub customer_note: Option<String>,
  pub internal_note: Option<String>,
  pub paid_at: Option<DateTime<Utc>>,
  pub shipped_at: Option<DateTime<Utc>>,
  pub delivered_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  #[sqlx(skip)]
  pub items: Vec<OrderItem>,
}

impl Order {
  /// Number of distinct lines.
  pub fn item_count(&self) -> usize {
    self.items.len()
  }

  /// Checkouts that were never paid stay out of the customer's order views.
  pub fn is_placed(&self) -> bool {
    match self.status {
      OrderStatus::Pending => false,
      OrderStatus::Cancelled => self.paid_at.is_some(),
      _ => true,
    }
  }
}

/// An order as listed in the admin views.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderView {
  #[serde(flatten)]
  pub order: Order,
  pub customer: Option<CustomerSummary>,
}
