// storefront/src/store/memory.rs

//! In-process store. Every operation takes the single lock, which gives the
//! same atomicity the PostgreSQL store gets from transactions and
//! conditional updates.

use super::{OrderListQuery, OrderSortField, SortDirection, Store, TimeRange};
use crate::errors::{AppError, Result};
use crate::models::order::AdminOrderView;
use crate::models::{Address, AddressPatch, Category, Order, OrderStatus, Product, Session, User};
use crate::services::address_book;
use crate::services::catalog::ProductFilter;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
  categories: Vec<Category>,
  products: Vec<Product>,
  users: Vec<User>,
  sessions: HashMap<String, Session>,
  addresses: Vec<Address>,
  orders: Vec<Order>,
}

impl Tables {
  fn customer(&self, user_id: Option<Uuid>) -> Option<crate::models::CustomerSummary> {
    let id = user_id?;
    self.users.iter().find(|u| u.id == id).map(User::summary)
  }

  fn admin_view(&self, order: &Order) -> AdminOrderView {
    AdminOrderView {
      order: order.clone(),
      customer: self.customer(order.user_id),
    }
  }
}

#[derive(Default)]
pub struct MemoryStore {
  tables: Mutex<Tables>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Drops a product from the catalog. Order lines keep their snapshot.
  pub fn remove_product(&self, product_id: &str) -> bool {
    let mut tables = self.tables.lock();
    let before = tables.products.len();
    tables.products.retain(|p| p.id != product_id);
    tables.products.len() != before
  }
}

fn catalog_order(a: &Product, b: &Product) -> Ordering {
  a.created_at.cmp(&b.created_at).then_with(|| a.slug.cmp(&b.slug))
}

fn matches_search(view: &AdminOrderView, needle: &str) -> bool {
  let hit = |value: &str| value.to_lowercase().contains(needle);
  let order = &view.order;
  hit(&order.order_number)
    || hit(&order.shipping.first_name)
    || hit(&order.shipping.last_name)
    || view.customer.as_ref().is_some_and(|c| {
      hit(&c.email) || c.name.as_deref().is_some_and(hit)
    })
}

fn compare_orders(a: &Order, b: &Order, field: OrderSortField) -> Ordering {
  match field {
    OrderSortField::CreatedAt => a.created_at.cmp(&b.created_at),
    OrderSortField::Total => a.total.cmp(&b.total),
    OrderSortField::OrderNumber => a.order_number.cmp(&b.order_number),
    // Declaration order, same as the PostgreSQL enum.
    OrderSortField::Status => a.status.cmp(&b.status),
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn list_categories(&self) -> Result<Vec<Category>> {
    let mut categories = self.tables.lock().categories.clone();
    categories.sort_by_key(|c| c.sort_order);
    Ok(categories)
  }

  async fn upsert_category(&self, category: &Category) -> Result<()> {
    let mut tables = self.tables.lock();
    match tables.categories.iter_mut().find(|c| c.slug == category.slug) {
      Some(existing) => *existing = category.clone(),
      None => tables.categories.push(category.clone()),
    }
    Ok(())
  }

  async fn upsert_product(&self, product: &Product) -> Result<()> {
    let mut tables = self.tables.lock();
    match tables.products.iter_mut().find(|p| p.id == product.id) {
      Some(existing) => {
        let created_at = existing.created_at;
        *existing = product.clone();
        existing.created_at = created_at;
        existing.updated_at = Utc::now();
      }
      None => tables.products.push(product.clone()),
    }
    Ok(())
  }

  async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
    let mut products = self.tables.lock().products.clone();
    products.sort_by(catalog_order);
    Ok(filter.apply(products))
  }

  async fn find_product(&self, slug_or_id: &str) -> Result<Option<Product>> {
    let tables = self.tables.lock();
    Ok(
      tables
        .products
        .iter()
        .find(|p| p.slug == slug_or_id || p.id == slug_or_id)
        .cloned(),
    )
  }

  async fn find_products_by_ids(&self, ids: &[String]) -> Result<Vec<Product>> {
    let tables = self.tables.lock();
    Ok(tables.products.iter().filter(|p| ids.contains(&p.id)).cloned().collect())
  }

  async fn related_products(&self, product: &Product, limit: i64) -> Result<Vec<Product>> {
    let filter = ProductFilter {
      category: Some(product.category.clone()),
      ..Default::default()
    };
    let mut related: Vec<Product> = self
      .tables
      .lock()
      .products
      .iter()
      .filter(|p| p.id != product.id && filter.matches(p))
      .cloned()
      .collect();
    related.sort_by(catalog_order);
    related.truncate(limit.max(0) as usize);
    Ok(related)
  }

  async fn decrement_stock(&self, product_id: &str, quantity: i32) -> Result<Option<i32>> {
    let mut tables = self.tables.lock();
    Ok(tables.products.iter_mut().find(|p| p.id == product_id).map(|p| {
      p.stock -= quantity;
      p.updated_at = Utc::now();
      p.stock
    }))
  }

  async fn count_products(&self) -> Result<i64> {
    Ok(self.tables.lock().products.len() as i64)
  }

  async fn count_low_stock(&self, threshold: i32) -> Result<i64> {
    Ok(self.tables.lock().products.iter().filter(|p| p.stock <= threshold).count() as i64)
  }

  async fn insert_user(&self, user: &User) -> Result<()> {
    let mut tables = self.tables.lock();
    if tables.users.iter().any(|u| u.email == user.email) {
      return Err(AppError::Validation("Un compte existe déjà avec cet email".to_string()));
    }
    tables.users.push(user.clone());
    Ok(())
  }

  async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
    Ok(self.tables.lock().users.iter().find(|u| u.id == id).cloned())
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    Ok(self.tables.lock().users.iter().find(|u| u.email == email).cloned())
  }

  async fn update_profile(&self, id: Uuid, name: Option<String>, phone: Option<String>) -> Result<Option<User>> {
    let mut tables = self.tables.lock();
    Ok(tables.users.iter_mut().find(|u| u.id == id).map(|user| {
      if name.is_some() {
        user.name = name;
      }
      if phone.is_some() {
        user.phone = phone;
      }
      user.updated_at = Utc::now();
      user.clone()
    }))
  }

  async fn count_customers(&self, range: TimeRange) -> Result<i64> {
    let tables = self.tables.lock();
    Ok(
      tables
        .users
        .iter()
        .filter(|u| !u.role.is_admin() && range.contains(u.created_at))
        .count() as i64,
    )
  }

  async fn insert_session(&self, session: &Session) -> Result<()> {
    self.tables.lock().sessions.insert(session.token.clone(), session.clone());
    Ok(())
  }

  async fn find_session_user(&self, token: &str, now: DateTime<Utc>) -> Result<Option<User>> {
    let tables = self.tables.lock();
    let Some(session) = tables.sessions.get(token).filter(|s| s.expires_at > now) else {
      return Ok(None);
    };
    Ok(tables.users.iter().find(|u| u.id == session.user_id).cloned())
  }

  async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<Address>> {
    let mut owned: Vec<Address> = self
      .tables
      .lock()
      .addresses
      .iter()
      .filter(|a| a.user_id == user_id)
      .cloned()
      .collect();
    address_book::sort_for_display(&mut owned);
    Ok(owned)
  }

  async fn find_address(&self, user_id: Uuid, id: Uuid) -> Result<Option<Address>> {
    let tables = self.tables.lock();
    Ok(tables.addresses.iter().find(|a| a.id == id && a.user_id == user_id).cloned())
  }

  async fn create_address(&self, mut address: Address) -> Result<Address> {
    let mut tables = self.tables.lock();
    let existing = tables.addresses.iter().filter(|a| a.user_id == address.user_id).count();
    address.is_default = address_book::should_be_default(address.is_default, existing);
    if address.is_default {
      for sibling in tables.addresses.iter_mut().filter(|a| a.user_id == address.user_id) {
        sibling.is_default = false;
      }
    }
    tables.addresses.push(address.clone());
    Ok(address)
  }

  async fn update_address(&self, user_id: Uuid, id: Uuid, patch: &AddressPatch) -> Result<Option<Address>> {
    let mut tables = self.tables.lock();
    let Some(index) = tables.addresses.iter().position(|a| a.id == id && a.user_id == user_id) else {
      return Ok(None);
    };
    let mut updated = tables.addresses[index].clone();
    let promote = address_book::apply_patch(&mut updated, patch, Utc::now())?;
    if promote {
      for sibling in tables.addresses.iter_mut().filter(|a| a.user_id == user_id) {
        sibling.is_default = false;
      }
    }
    tables.addresses[index] = updated.clone();
    Ok(Some(updated))
  }

  async fn delete_address(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
    let mut tables = self.tables.lock();
    let Some(index) = tables.addresses.iter().position(|a| a.id == id && a.user_id == user_id) else {
      return Ok(false);
    };
    let removed = tables.addresses.remove(index);
    if removed.is_default {
      let remaining: Vec<Address> = tables.addresses.iter().filter(|a| a.user_id == user_id).cloned().collect();
      if let Some(next_id) = address_book::successor_default(&remaining) {
        if let Some(next) = tables.addresses.iter_mut().find(|a| a.id == next_id) {
          next.is_default = true;
          next.updated_at = Utc::now();
        }
      }
    }
    Ok(true)
  }

  async fn count_orders(&self, range: TimeRange) -> Result<i64> {
    Ok(self.tables.lock().orders.iter().filter(|o| range.contains(o.created_at)).count() as i64)
  }

  async fn insert_order(&self, order: &Order) -> Result<()> {
    let mut tables = self.tables.lock();
    if tables
      .orders
      .iter()
      .any(|o| o.payment_session_id == order.payment_session_id || o.order_number == order.order_number)
    {
      return Err(AppError::Internal(format!(
        "duplicate order for session {}",
        order.payment_session_id
      )));
    }
    tables.orders.push(order.clone());
    Ok(())
  }

  async fn find_order(&self, id: Uuid) -> Result<Option<Order>> {
    Ok(self.tables.lock().orders.iter().find(|o| o.id == id).cloned())
  }

  async fn find_order_by_session(&self, payment_session_id: &str) -> Result<Option<Order>> {
    let tables = self.tables.lock();
    Ok(tables.orders.iter().find(|o| o.payment_session_id == payment_session_id).cloned())
  }

  async fn list_user_orders(&self, user_id: Uuid) -> Result<Vec<Order>> {
    let mut owned: Vec<Order> = self
      .tables
      .lock()
      .orders
      .iter()
      .filter(|o| o.user_id == Some(user_id))
      .cloned()
      .collect();
    owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(owned)
  }

  async fn mark_order_paid(
    &self,
    payment_session_id: &str,
    payment_intent_id: Option<&str>,
    paid_at: DateTime<Utc>,
  ) -> Result<Option<Order>> {
    let mut tables = self.tables.lock();
    let Some(order) = tables
      .orders
      .iter_mut()
      .find(|o| o.payment_session_id == payment_session_id && o.status == OrderStatus::Pending)
    else {
      return Ok(None);
    };
    order.status = OrderStatus::Paid;
    order.paid_at = Some(paid_at);
    order.payment_intent_id = payment_intent_id.map(str::to_string);
    order.updated_at = paid_at;
    Ok(Some(order.clone()))
  }

  async fn cancel_pending_order(&self, payment_session_id: &str) -> Result<bool> {
    let mut tables = self.tables.lock();
    match tables
      .orders
      .iter_mut()
      .find(|o| o.payment_session_id == payment_session_id && o.status == OrderStatus::Pending)
    {
      Some(order) => {
        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        Ok(true)
      }
      None => Ok(false),
    }
  }

  async fn update_order(&self, order: &Order, expected_status: OrderStatus) -> Result<bool> {
    let mut tables = self.tables.lock();
    let stored = tables
      .orders
      .iter_mut()
      .find(|o| o.id == order.id)
      .ok_or_else(|| AppError::NotFound("Commande non trouvée".to_string()))?;
    if stored.status != expected_status {
      return Ok(false);
    }
    stored.status = order.status;
    stored.tracking_number = order.tracking_number.clone();
    stored.tracking_url = order.tracking_url.clone();
    stored.internal_note = order.internal_note.clone();
    stored.paid_at = order.paid_at;
    stored.shipped_at = order.shipped_at;
    stored.delivered_at = order.delivered_at;
    stored.updated_at = order.updated_at;
    Ok(true)
  }

  async fn list_orders(&self, query: &OrderListQuery) -> Result<(Vec<AdminOrderView>, i64)> {
    let tables = self.tables.lock();
    let needle = query.search.as_deref().map(str::to_lowercase).filter(|s| !s.is_empty());
    let mut views: Vec<AdminOrderView> = tables
      .orders
      .iter()
      .filter(|o| query.status.map_or(true, |s| o.status == s))
      .map(|o| tables.admin_view(o))
      .filter(|v| needle.as_deref().map_or(true, |n| matches_search(v, n)))
      .collect();
    views.sort_by(|a, b| {
      let ord = compare_orders(&a.order, &b.order, query.sort_by);
      match query.sort_order {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
      }
    });
    let total = views.len() as i64;
    let page = views
      .into_iter()
      .skip(query.offset().max(0) as usize)
      .take(query.limit.max(0) as usize)
      .collect();
    Ok((page, total))
  }

  async fn recent_orders(&self, limit: i64) -> Result<Vec<AdminOrderView>> {
    let tables = self.tables.lock();
    let mut orders: Vec<&Order> = tables.orders.iter().filter(|o| o.is_placed()).collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(
      orders
        .into_iter()
        .take(limit.max(0) as usize)
        .map(|o| tables.admin_view(o))
        .collect(),
    )
  }

  async fn sum_revenue(&self, range: TimeRange) -> Result<i64> {
    let tables = self.tables.lock();
    Ok(
      tables
        .orders
        .iter()
        .filter(|o| o.status.counts_as_revenue() && range.contains(o.created_at))
        .map(|o| o.total)
        .sum(),
    )
  }

  async fn count_placed_orders(&self, range: TimeRange) -> Result<i64> {
    let tables = self.tables.lock();
    Ok(
      tables
        .orders
        .iter()
        .filter(|o| o.is_placed() && range.contains(o.created_at))
        .count() as i64,
    )
  }

  async fn count_orders_by_status(&self) -> Result<Vec<(OrderStatus, i64)>> {
    let tables = self.tables.lock();
    Ok(
      OrderStatus::ALL
        .into_iter()
        .map(|status| {
          let count = tables.orders.iter().filter(|o| o.status == status && o.is_placed()).count();
          (status, count as i64)
        })
        .filter(|(_, count)| *count > 0)
        .collect(),
    )
  }
}
