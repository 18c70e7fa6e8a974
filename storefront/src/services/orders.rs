// storefront/src/services/orders.rs

//! Admin edits of an order and the dashboard figures.

use crate::errors::{AppError, Result};
use crate::models::order::AdminOrderView;
use crate::models::{Order, OrderStatus};
use crate::services::catalog::LOW_STOCK_THRESHOLD;
use crate::store::{Store, TimeRange};
use chrono::{DateTime, Datelike, Months, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Body of `PUT /api/admin/orders/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
  pub status: Option<String>,
  pub tracking_number: Option<String>,
  pub tracking_url: Option<String>,
  pub internal_note: Option<String>,
}

impl OrderUpdate {
  pub fn parsed_status(&self) -> Result<Option<OrderStatus>> {
    self
      .status
      .as_deref()
      .map(|raw| raw.parse::<OrderStatus>().map_err(|e| AppError::Validation(e.to_string())))
      .transpose()
  }
}

/// Applies an admin edit. Any status may replace any other. Milestone
/// timestamps are stamped the first time their status is reached and never
/// moved afterwards.
pub fn apply_order_update(order: &mut Order, update: &OrderUpdate, now: DateTime<Utc>) -> Result<()> {
  if let Some(status) = update.parsed_status()? {
    order.status = status;
    let stamp = match status {
      OrderStatus::Paid => Some(&mut order.paid_at),
      OrderStatus::Shipped => Some(&mut order.shipped_at),
      OrderStatus::Delivered => Some(&mut order.delivered_at),
      _ => None,
    };
    if let Some(slot) = stamp {
      slot.get_or_insert(now);
    }
  }
  if let Some(tracking_number) = &update.tracking_number {
    order.tracking_number = Some(tracking_number.trim().to_string()).filter(|t| !t.is_empty());
  }
  if let Some(tracking_url) = &update.tracking_url {
    order.tracking_url = Some(tracking_url.trim().to_string()).filter(|t| !t.is_empty());
  }
  if let Some(internal_note) = &update.internal_note {
    order.internal_note = Some(internal_note.clone()).filter(|t| !t.is_empty());
  }
  order.updated_at = now;
  Ok(())
}

/// Whether the edit that moved an order from `previous` to its current state
/// warrants the shipping email.
pub fn should_notify_shipping(previous: OrderStatus, order: &Order) -> bool {
  order.status == OrderStatus::Shipped
    && previous != OrderStatus::Shipped
    && order.tracking_number.as_deref().is_some_and(|t| !t.is_empty())
}

/// Percent change rounded to one decimal; 100 when growing from zero.
pub fn growth(current: i64, previous: i64) -> f64 {
  if previous == 0 {
    return if current > 0 { 100.0 } else { 0.0 };
  }
  let raw = (current - previous) as f64 / previous as f64 * 100.0;
  (raw * 10.0).round() / 10.0
}

/// First instant of the month containing `now`, and of the month before.
pub fn month_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
  let this_month = Utc
    .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
    .single()
    .unwrap_or(now);
  let last_month = this_month.checked_sub_months(Months::new(1)).unwrap_or(this_month);
  (this_month, last_month)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueStats {
  pub total: i64,
  pub this_month: i64,
  pub growth: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
  pub total: i64,
  pub this_month: i64,
  pub pending: i64,
  pub growth: f64,
  pub by_status: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerStats {
  pub total: i64,
  pub new_this_month: i64,
  pub growth: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStats {
  pub total: i64,
  pub low_stock: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
  pub revenue: RevenueStats,
  pub orders: OrderStats,
  pub customers: CustomerStats,
  pub products: ProductStats,
  pub recent_orders: Vec<AdminOrderView>,
}

#[tracing::instrument(name = "orders::dashboard_stats", skip(store), err(Display))]
pub async fn dashboard_stats(store: &dyn Store, now: DateTime<Utc>) -> Result<DashboardStats> {
  let (this_month, last_month) = month_bounds(now);
  let current = TimeRange::since(this_month);
  let previous = TimeRange::between(last_month, this_month);

  let revenue_total = store.sum_revenue(TimeRange::all()).await?;
  let revenue_this = store.sum_revenue(current).await?;
  let revenue_last = store.sum_revenue(previous).await?;

  let orders_total = store.count_placed_orders(TimeRange::all()).await?;
  let orders_this = store.count_placed_orders(current).await?;
  let orders_last = store.count_placed_orders(previous).await?;
  let by_status_rows = store.count_orders_by_status().await?;
  let pending = by_status_rows.iter().filter(|(s, _)| s.is_open()).map(|(_, n)| n).sum();
  let by_status = by_status_rows
    .into_iter()
    .map(|(status, count)| (status.as_str().to_string(), count))
    .collect();

  let customers_total = store.count_customers(TimeRange::all()).await?;
  let customers_this = store.count_customers(current).await?;
  let customers_last = store.count_customers(previous).await?;

  Ok(DashboardStats {
    revenue: RevenueStats {
      total: revenue_total,
      this_month: revenue_this,
      growth: growth(revenue_this, revenue_last),
    },
    orders: OrderStats {
      total: orders_total,
      this_month: orders_this,
      pending,
      growth: growth(orders_this, orders_last),
      by_status,
    },
    customers: CustomerStats {
      total: customers_total,
      new_this_month: customers_this,
      growth: growth(customers_this, customers_last),
    },
    products: ProductStats {
      total: store.count_products().await?,
      low_stock: store.count_low_stock(LOW_STOCK_THRESHOLD).await?,
    },
    recent_orders: store.recent_orders(5).await?,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::ShippingSnapshot;
  use uuid::Uuid;

  fn order(status: OrderStatus) -> Order {
    let now = Utc::now();
    Order {
      id: Uuid::new_v4(),
      order_number: "EVA-2026-00001".into(),
      user_id: None,
      status,
      shipping: ShippingSnapshot {
        first_name: "Léa".into(),
        last_name: "Martin".into(),
        address1: "12 rue des Lilas".into(),
        address2: None,
        city: "Lyon".into(),
        postal_code: "69003".into(),
        country: "France".into(),
        phone: None,
      },
      subtotal: 1198,
      shipping_cost: 0,
      discount: 0,
      total: 1198,
      currency: "eur".into(),
      payment_session_id: "cs_1".into(),
      payment_intent_id: None,
      tracking_number: None,
      tracking_url: None,
      customer_note: None,
      internal_note: None,
      paid_at: None,
      shipped_at: None,
      delivered_at: None,
      created_at: now,
      updated_at: now,
      items: Vec::new(),
    }
  }

  fn update(status: &str, tracking: Option<&str>) -> OrderUpdate {
    OrderUpdate {
      status: Some(status.to_string()),
      tracking_number: tracking.map(str::to_string),
      ..Default::default()
    }
  }

  #[test]
  fn shipped_at_is_stamped_once() {
    let mut o = order(OrderStatus::Paid);
    let first = Utc::now();
    apply_order_update(&mut o, &update("SHIPPED", Some("6A1")), first).unwrap();
    assert_eq!(o.shipped_at, Some(first));

    let later = first + chrono::Duration::hours(2);
    apply_order_update(&mut o, &update("PROCESSING", None), later).unwrap();
    apply_order_update(&mut o, &update("SHIPPED", None), later).unwrap();
    assert_eq!(o.shipped_at, Some(first));
    assert_eq!(o.tracking_number.as_deref(), Some("6A1"));
  }

  #[test]
  fn any_status_can_follow_any_other() {
    let mut o = order(OrderStatus::Completed);
    apply_order_update(&mut o, &update("PENDING", None), Utc::now()).unwrap();
    assert_eq!(o.status, OrderStatus::Pending);
  }

  #[test]
  fn unknown_status_is_a_validation_error() {
    let mut o = order(OrderStatus::Paid);
    let err = apply_order_update(&mut o, &update("LOST", None), Utc::now()).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(o.status, OrderStatus::Paid);
  }

  #[test]
  fn shipping_email_needs_transition_and_tracking() {
    let mut o = order(OrderStatus::Shipped);
    assert!(!should_notify_shipping(OrderStatus::Paid, &o));
    o.tracking_number = Some("6A1".into());
    assert!(should_notify_shipping(OrderStatus::Paid, &o));
    assert!(!should_notify_shipping(OrderStatus::Shipped, &o));
  }

  #[test]
  fn growth_rounds_and_handles_zero_base() {
    assert_eq!(growth(3, 0), 100.0);
    assert_eq!(growth(0, 0), 0.0);
    assert_eq!(growth(2, 3), -33.3);
    assert_eq!(growth(150, 100), 50.0);
  }

  #[test]
  fn month_bounds_cross_year_boundary() {
    let now = Utc.with_ymd_and_hms(2026, 1, 20, 12, 0, 0).unwrap();
    let (this_month, last_month) = month_bounds(now);
    assert_eq!(this_month, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    assert_eq!(last_month, Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap());
  }
}
