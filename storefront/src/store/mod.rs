// storefront/src/store/mod.rs

//! Persistence behind one trait so the pipelines and handlers run the same
//! against PostgreSQL and the in-memory store used by tests.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::errors::Result;
use crate::models::order::AdminOrderView;
use crate::models::{Address, AddressPatch, Category, Order, OrderStatus, Product, Session, User};
use crate::services::catalog::ProductFilter;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Half-open `[from, to)` interval; an open end is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
  pub from: Option<DateTime<Utc>>,
  pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
  pub fn all() -> Self {
    Self::default()
  }

  pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
    Self {
      from: Some(from),
      to: Some(to),
    }
  }

  pub fn since(from: DateTime<Utc>) -> Self {
    Self { from: Some(from), to: None }
  }

  pub fn contains(&self, at: DateTime<Utc>) -> bool {
    self.from.map_or(true, |from| at >= from) && self.to.map_or(true, |to| at < to)
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderSortField {
  #[default]
  CreatedAt,
  Total,
  OrderNumber,
  Status,
}

impl OrderSortField {
  pub fn parse(raw: &str) -> Option<Self> {
    match raw {
      "createdAt" => Some(Self::CreatedAt),
      "total" => Some(Self::Total),
      "orderNumber" => Some(Self::OrderNumber),
      "status" => Some(Self::Status),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
  Asc,
  #[default]
  Desc,
}

#[derive(Debug, Clone)]
pub struct OrderListQuery {
  /// 1-based.
  pub page: i64,
  pub limit: i64,
  pub status: Option<OrderStatus>,
  pub search: Option<String>,
  pub sort_by: OrderSortField,
  pub sort_order: SortDirection,
}

impl Default for OrderListQuery {
  fn default() -> Self {
    Self {
      page: 1,
      limit: 20,
      status: None,
      search: None,
      sort_by: OrderSortField::default(),
      sort_order: SortDirection::default(),
    }
  }
}

impl OrderListQuery {
  pub fn offset(&self) -> i64 {
    (self.page.max(1) - 1).saturating_mul(self.limit.max(0))
  }
}

#[async_trait]
pub trait Store: Send + Sync {
  // --- catalog ---
  async fn list_categories(&self) -> Result<Vec<Category>>;
  async fn upsert_category(&self, category: &Category) -> Result<()>;
  async fn upsert_product(&self, product: &Product) -> Result<()>;
  async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>>;
  /// Matches either the slug or the id.
  async fn find_product(&self, slug_or_id: &str) -> Result<Option<Product>>;
  async fn find_products_by_ids(&self, ids: &[String]) -> Result<Vec<Product>>;
  /// Active products of the same category, excluding `product`.
  async fn related_products(&self, product: &Product, limit: i64) -> Result<Vec<Product>>;
  /// Subtracts `quantity` from the stock and returns the new level, or
  /// `None` for an unknown product.
  async fn decrement_stock(&self, product_id: &str, quantity: i32) -> Result<Option<i32>>;
  async fn count_products(&self) -> Result<i64>;
  async fn count_low_stock(&self, threshold: i32) -> Result<i64>;

  // --- accounts ---
  async fn insert_user(&self, user: &User) -> Result<()>;
  async fn find_user(&self, id: Uuid) -> Result<Option<User>>;
  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
  async fn update_profile(&self, id: Uuid, name: Option<String>, phone: Option<String>) -> Result<Option<User>>;
  /// Customers (role `CUSTOMER`) created within `range`.
  async fn count_customers(&self, range: TimeRange) -> Result<i64>;
  async fn insert_session(&self, session: &Session) -> Result<()>;
  async fn find_session_user(&self, token: &str, now: DateTime<Utc>) -> Result<Option<User>>;

  // --- address book ---
  /// Default first, then newest first.
  async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<Address>>;
  async fn find_address(&self, user_id: Uuid, id: Uuid) -> Result<Option<Address>>;
  /// Inserts `address`; its `is_default` is the caller's request and is
  /// forced on for a customer's first address. Promoting clears siblings.
  async fn create_address(&self, address: Address) -> Result<Address>;
  async fn update_address(&self, user_id: Uuid, id: Uuid, patch: &AddressPatch) -> Result<Option<Address>>;
  /// Deletes an owned address, promoting the newest remaining one if the
  /// default was removed. Returns `false` when nothing was deleted.
  async fn delete_address(&self, user_id: Uuid, id: Uuid) -> Result<bool>;

  // --- orders ---
  async fn count_orders(&self, range: TimeRange) -> Result<i64>;
  async fn insert_order(&self, order: &Order) -> Result<()>;
  async fn find_order(&self, id: Uuid) -> Result<Option<Order>>;
  async fn find_order_by_session(&self, payment_session_id: &str) -> Result<Option<Order>>;
  /// Newest first, with items.
  async fn list_user_orders(&self, user_id: Uuid) -> Result<Vec<Order>>;
  /// Conditional `PENDING -> PAID`. Returns the updated order when this call
  /// performed the transition, `None` when the order is missing or was
  /// already past `PENDING`.
  async fn mark_order_paid(
    &self,
    payment_session_id: &str,
    payment_intent_id: Option<&str>,
    paid_at: DateTime<Utc>,
  ) -> Result<Option<Order>>;
  /// Conditional `PENDING -> CANCELLED`.
  async fn cancel_pending_order(&self, payment_session_id: &str) -> Result<bool>;
  /// Writes status, tracking, notes and milestone timestamps, but only while
  /// the stored status is still `expected_status`. Returns whether the row
  /// was written.
  async fn update_order(&self, order: &Order, expected_status: OrderStatus) -> Result<bool>;
  async fn list_orders(&self, query: &OrderListQuery) -> Result<(Vec<AdminOrderView>, i64)>;
  /// Placed orders only (see [`Order::is_placed`]), newest first.
  async fn recent_orders(&self, limit: i64) -> Result<Vec<AdminOrderView>>;
  /// Sum of totals of revenue-counting orders created within `range`.
  async fn sum_revenue(&self, range: TimeRange) -> Result<i64>;
  /// Placed orders created within `range`.
  async fn count_placed_orders(&self, range: TimeRange) -> Result<i64>;
  /// Placed orders per status.
  async fn count_orders_by_status(&self) -> Result<Vec<(OrderStatus, i64)>>;
}
