// storefront/src/store/postgres.rs

use super::{OrderListQuery, OrderSortField, SortDirection, Store, TimeRange};
use crate::errors::Result;
use crate::models::order::AdminOrderView;
use crate::models::{
  Address, AddressPatch, Category, CustomerSummary, Order, OrderItem, OrderStatus, Product, Session, User,
};
use crate::services::address_book;
use crate::services::catalog::ProductFilter;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;

const REVENUE_STATUSES: &str = "('PAID', 'PROCESSING', 'SHIPPED', 'DELIVERED', 'COMPLETED')";
/// Same rule as `Order::is_placed`.
const PLACED_ORDERS: &str = "status <> 'PENDING' AND (status <> 'CANCELLED' OR paid_at IS NOT NULL)";

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub async fn connect(database_url: &str) -> Result<Self> {
    let pool = PgPoolOptions::new().connect(database_url).await?;
    info!("Successfully connected to the database.");
    Ok(Self { pool })
  }

  pub fn from_pool(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn migrate(&self) -> Result<()> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    info!("Database migrations applied.");
    Ok(())
  }

  async fn attach_items(&self, orders: &mut [Order]) -> Result<()> {
    if orders.is_empty() {
      return Ok(());
    }
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let items = sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = ANY($1) ORDER BY id")
      .bind(&ids)
      .fetch_all(&self.pool)
      .await?;
    let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in items {
      by_order.entry(item.order_id).or_default().push(item);
    }
    for order in orders.iter_mut() {
      order.items = by_order.remove(&order.id).unwrap_or_default();
    }
    Ok(())
  }

  async fn with_items(&self, order: Option<Order>) -> Result<Option<Order>> {
    match order {
      Some(order) => {
        let mut orders = [order];
        self.attach_items(&mut orders).await?;
        let [order] = orders;
        Ok(Some(order))
      }
      None => Ok(None),
    }
  }

  async fn admin_views(&self, mut orders: Vec<Order>) -> Result<Vec<AdminOrderView>> {
    self.attach_items(&mut orders).await?;
    let user_ids: Vec<Uuid> = orders.iter().filter_map(|o| o.user_id).collect();
    let customers: HashMap<Uuid, CustomerSummary> =
      sqlx::query_as::<_, CustomerSummary>("SELECT id, name, email FROM users WHERE id = ANY($1)")
        .bind(&user_ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();
    Ok(
      orders
        .into_iter()
        .map(|order| {
          let customer = order.user_id.and_then(|id| customers.get(&id).cloned());
          AdminOrderView { order, customer }
        })
        .collect(),
    )
  }

  /// Serializes address-book writes of one customer.
  async fn lock_user(tx: &mut Transaction<'_, Postgres>, user_id: Uuid) -> Result<()> {
    sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
      .bind(user_id)
      .fetch_optional(&mut **tx)
      .await?;
    Ok(())
  }
}

fn like_pattern(raw: &str) -> String {
  let escaped = raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
  format!("%{}%", escaped)
}

fn sort_column(field: OrderSortField) -> &'static str {
  match field {
    OrderSortField::CreatedAt => "o.created_at",
    OrderSortField::Total => "o.total",
    OrderSortField::OrderNumber => "o.order_number",
    OrderSortField::Status => "o.status",
  }
}

#[async_trait]
impl Store for PgStore {
  async fn list_categories(&self) -> Result<Vec<Category>> {
    Ok(
      sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY sort_order, slug")
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn upsert_category(&self, category: &Category) -> Result<()> {
    sqlx::query(
      "INSERT INTO categories (slug, name, description, sort_order) VALUES ($1, $2, $3, $4)
       ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name, description = EXCLUDED.description,
       sort_order = EXCLUDED.sort_order",
    )
    .bind(&category.slug)
    .bind(&category.name)
    .bind(&category.description)
    .bind(category.sort_order)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn upsert_product(&self, product: &Product) -> Result<()> {
    sqlx::query(
      "INSERT INTO products (id, slug, name, description, price, compare_at_price, currency, category, tags,
         images, stock, is_active, is_featured, created_at, updated_at)
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $14)
       ON CONFLICT (id) DO UPDATE SET slug = EXCLUDED.slug, name = EXCLUDED.name,
         description = EXCLUDED.description, price = EXCLUDED.price, compare_at_price = EXCLUDED.compare_at_price,
         currency = EXCLUDED.currency, category = EXCLUDED.category, tags = EXCLUDED.tags,
         images = EXCLUDED.images, stock = EXCLUDED.stock, is_active = EXCLUDED.is_active,
         is_featured = EXCLUDED.is_featured, updated_at = NOW()",
    )
    .bind(&product.id)
    .bind(&product.slug)
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(product.compare_at_price)
    .bind(&product.currency)
    .bind(&product.category)
    .bind(&product.tags)
    .bind(&product.images)
    .bind(product.stock)
    .bind(product.is_active)
    .bind(product.is_featured)
    .bind(product.created_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  #[instrument(name = "PgStore::list_products", skip(self), err(Display))]
  async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
    let search = filter.search.as_deref().filter(|s| !s.is_empty()).map(like_pattern);
    Ok(
      sqlx::query_as::<_, Product>(
        "SELECT * FROM products
         WHERE is_active
           AND ($1::text IS NULL OR category = $1)
           AND ($2::text IS NULL OR name ILIKE $2 OR description ILIKE $2
                OR EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE tag ILIKE $2))
           AND (NOT $3 OR is_featured)
         ORDER BY created_at, slug
         LIMIT $4",
      )
      .bind(&filter.category)
      .bind(search)
      .bind(filter.featured_only)
      .bind(filter.limit.map(|l| l.max(0)))
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn find_product(&self, slug_or_id: &str) -> Result<Option<Product>> {
    Ok(
      sqlx::query_as::<_, Product>("SELECT * FROM products WHERE slug = $1 OR id = $1 LIMIT 1")
        .bind(slug_or_id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn find_products_by_ids(&self, ids: &[String]) -> Result<Vec<Product>> {
    Ok(
      sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn related_products(&self, product: &Product, limit: i64) -> Result<Vec<Product>> {
    Ok(
      sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE category = $1 AND id <> $2 AND is_active
         ORDER BY created_at, slug LIMIT $3",
      )
      .bind(&product.category)
      .bind(&product.id)
      .bind(limit)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn decrement_stock(&self, product_id: &str, quantity: i32) -> Result<Option<i32>> {
    Ok(
      sqlx::query_scalar::<_, i32>(
        "UPDATE products SET stock = stock - $2, updated_at = NOW() WHERE id = $1 RETURNING stock",
      )
      .bind(product_id)
      .bind(quantity)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  async fn count_products(&self) -> Result<i64> {
    Ok(
      sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
        .fetch_one(&self.pool)
        .await?,
    )
  }

  async fn count_low_stock(&self, threshold: i32) -> Result<i64> {
    Ok(
      sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE stock <= $1")
        .bind(threshold)
        .fetch_one(&self.pool)
        .await?,
    )
  }

  async fn insert_user(&self, user: &User) -> Result<()> {
    sqlx::query(
      "INSERT INTO users (id, name, email, phone, image, password_hash, role, created_at, updated_at)
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.phone)
    .bind(&user.image)
    .bind(&user.password_hash)
    .bind(user.role)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
    Ok(
      sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    Ok(
      sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn update_profile(&self, id: Uuid, name: Option<String>, phone: Option<String>) -> Result<Option<User>> {
    Ok(
      sqlx::query_as::<_, User>(
        "UPDATE users SET name = COALESCE($2, name), phone = COALESCE($3, phone), updated_at = NOW()
         WHERE id = $1 RETURNING *",
      )
      .bind(id)
      .bind(name)
      .bind(phone)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  async fn count_customers(&self, range: TimeRange) -> Result<i64> {
    Ok(
      sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE role = 'CUSTOMER'
         AND ($1::timestamptz IS NULL OR created_at >= $1)
         AND ($2::timestamptz IS NULL OR created_at < $2)",
      )
      .bind(range.from)
      .bind(range.to)
      .fetch_one(&self.pool)
      .await?,
    )
  }

  async fn insert_session(&self, session: &Session) -> Result<()> {
    sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
      .bind(&session.token)
      .bind(session.user_id)
      .bind(session.expires_at)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn find_session_user(&self, token: &str, now: DateTime<Utc>) -> Result<Option<User>> {
    Ok(
      sqlx::query_as::<_, User>(
        "SELECT u.* FROM sessions s JOIN users u ON u.id = s.user_id WHERE s.token = $1 AND s.expires_at > $2",
      )
      .bind(token)
      .bind(now)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<Address>> {
    Ok(
      sqlx::query_as::<_, Address>(
        "SELECT * FROM addresses WHERE user_id = $1 ORDER BY is_default DESC, created_at DESC",
      )
      .bind(user_id)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn find_address(&self, user_id: Uuid, id: Uuid) -> Result<Option<Address>> {
    Ok(
      sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  #[instrument(name = "PgStore::create_address", skip_all, fields(user_id = %address.user_id), err(Display))]
  async fn create_address(&self, mut address: Address) -> Result<Address> {
    let mut tx = self.pool.begin().await?;
    Self::lock_user(&mut tx, address.user_id).await?;
    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM addresses WHERE user_id = $1")
      .bind(address.user_id)
      .fetch_one(&mut *tx)
      .await?;
    address.is_default = address_book::should_be_default(address.is_default, existing as usize);
    if address.is_default {
      sqlx::query("UPDATE addresses SET is_default = FALSE, updated_at = NOW() WHERE user_id = $1 AND is_default")
        .bind(address.user_id)
        .execute(&mut *tx)
        .await?;
    }
    sqlx::query(
      "INSERT INTO addresses (id, user_id, label, first_name, last_name, address1, address2, city, postal_code,
         country, phone, is_default, created_at, updated_at)
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
    )
    .bind(address.id)
    .bind(address.user_id)
    .bind(&address.label)
    .bind(&address.first_name)
    .bind(&address.last_name)
    .bind(&address.address1)
    .bind(&address.address2)
    .bind(&address.city)
    .bind(&address.postal_code)
    .bind(&address.country)
    .bind(&address.phone)
    .bind(address.is_default)
    .bind(address.created_at)
    .bind(address.updated_at)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(address)
  }

  async fn update_address(&self, user_id: Uuid, id: Uuid, patch: &AddressPatch) -> Result<Option<Address>> {
    let mut tx = self.pool.begin().await?;
    Self::lock_user(&mut tx, user_id).await?;
    let current = sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE id = $1 AND user_id = $2")
      .bind(id)
      .bind(user_id)
      .fetch_optional(&mut *tx)
      .await?;
    let Some(mut address) = current else {
      return Ok(None);
    };
    let promote = address_book::apply_patch(&mut address, patch, Utc::now())?;
    if promote {
      sqlx::query("UPDATE addresses SET is_default = FALSE, updated_at = NOW() WHERE user_id = $1 AND id <> $2")
        .bind(user_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    }
    sqlx::query(
      "UPDATE addresses SET label = $3, first_name = $4, last_name = $5, address1 = $6, address2 = $7, city = $8,
         postal_code = $9, country = $10, phone = $11, is_default = $12, updated_at = $13
       WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .bind(&address.label)
    .bind(&address.first_name)
    .bind(&address.last_name)
    .bind(&address.address1)
    .bind(&address.address2)
    .bind(&address.city)
    .bind(&address.postal_code)
    .bind(&address.country)
    .bind(&address.phone)
    .bind(address.is_default)
    .bind(address.updated_at)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(Some(address))
  }

  async fn delete_address(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
    let mut tx = self.pool.begin().await?;
    Self::lock_user(&mut tx, user_id).await?;
    let removed = sqlx::query_scalar::<_, bool>("DELETE FROM addresses WHERE id = $1 AND user_id = $2 RETURNING is_default")
      .bind(id)
      .bind(user_id)
      .fetch_optional(&mut *tx)
      .await?;
    let Some(was_default) = removed else {
      return Ok(false);
    };
    if was_default {
      let remaining = sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;
      if let Some(next_id) = address_book::successor_default(&remaining) {
        sqlx::query("UPDATE addresses SET is_default = TRUE, updated_at = NOW() WHERE id = $1")
          .bind(next_id)
          .execute(&mut *tx)
          .await?;
      }
    }
    tx.commit().await?;
    Ok(true)
  }

  async fn count_orders(&self, range: TimeRange) -> Result<i64> {
    Ok(
      sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM orders
         WHERE ($1::timestamptz IS NULL OR created_at >= $1) AND ($2::timestamptz IS NULL OR created_at < $2)",
      )
      .bind(range.from)
      .bind(range.to)
      .fetch_one(&self.pool)
      .await?,
    )
  }

  #[instrument(name = "PgStore::insert_order", skip_all, fields(order_number = %order.order_number), err(Display))]
  async fn insert_order(&self, order: &Order) -> Result<()> {
    let mut tx = self.pool.begin().await?;
    sqlx::query(
      "INSERT INTO orders (id, order_number, user_id, status, shipping_first_name, shipping_last_name,
         shipping_address1, shipping_address2, shipping_city, shipping_postal_code, shipping_country, shipping_phone,
         subtotal, shipping_cost, discount, total, currency, payment_session_id, payment_intent_id, customer_note,
         created_at, updated_at)
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)",
    )
    .bind(order.id)
    .bind(&order.order_number)
    .bind(order.user_id)
    .bind(order.status)
    .bind(&order.shipping.first_name)
    .bind(&order.shipping.last_name)
    .bind(&order.shipping.address1)
    .bind(&order.shipping.address2)
    .bind(&order.shipping.city)
    .bind(&order.shipping.postal_code)
    .bind(&order.shipping.country)
    .bind(&order.shipping.phone)
    .bind(order.subtotal)
    .bind(order.shipping_cost)
    .bind(order.discount)
    .bind(order.total)
    .bind(&order.currency)
    .bind(&order.payment_session_id)
    .bind(&order.payment_intent_id)
    .bind(&order.customer_note)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *tx)
    .await?;

    for item in &order.items {
      sqlx::query(
        "INSERT INTO order_items (id, order_id, product_id, product_name, product_image, unit_price, quantity, total)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
      )
      .bind(item.id)
      .bind(order.id)
      .bind(&item.product_id)
      .bind(&item.product_name)
      .bind(&item.product_image)
      .bind(item.unit_price)
      .bind(item.quantity)
      .bind(item.total)
      .execute(&mut *tx)
      .await?;
    }
    tx.commit().await?;
    Ok(())
  }

  async fn find_order(&self, id: Uuid) -> Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    self.with_items(order).await
  }

  async fn find_order_by_session(&self, payment_session_id: &str) -> Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE payment_session_id = $1")
      .bind(payment_session_id)
      .fetch_optional(&self.pool)
      .await?;
    self.with_items(order).await
  }

  async fn list_user_orders(&self, user_id: Uuid) -> Result<Vec<Order>> {
    let mut orders = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC")
      .bind(user_id)
      .fetch_all(&self.pool)
      .await?;
    self.attach_items(&mut orders).await?;
    Ok(orders)
  }

  #[instrument(name = "PgStore::mark_order_paid", skip(self), err(Display))]
  async fn mark_order_paid(
    &self,
    payment_session_id: &str,
    payment_intent_id: Option<&str>,
    paid_at: DateTime<Utc>,
  ) -> Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(
      "UPDATE orders SET status = 'PAID', paid_at = $3, payment_intent_id = $2, updated_at = $3
       WHERE payment_session_id = $1 AND status = 'PENDING'
       RETURNING *",
    )
    .bind(payment_session_id)
    .bind(payment_intent_id)
    .bind(paid_at)
    .fetch_optional(&self.pool)
    .await?;
    self.with_items(order).await
  }

  async fn cancel_pending_order(&self, payment_session_id: &str) -> Result<bool> {
    let result = sqlx::query(
      "UPDATE orders SET status = 'CANCELLED', updated_at = NOW()
       WHERE payment_session_id = $1 AND status = 'PENDING'",
    )
    .bind(payment_session_id)
    .execute(&self.pool)
    .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn update_order(&self, order: &Order, expected_status: OrderStatus) -> Result<bool> {
    let result = sqlx::query(
      "UPDATE orders SET status = $2, tracking_number = $3, tracking_url = $4, internal_note = $5,
         paid_at = $6, shipped_at = $7, delivered_at = $8, updated_at = $9
       WHERE id = $1 AND status = $10",
    )
    .bind(order.id)
    .bind(order.status)
    .bind(&order.tracking_number)
    .bind(&order.tracking_url)
    .bind(&order.internal_note)
    .bind(order.paid_at)
    .bind(order.shipped_at)
    .bind(order.delivered_at)
    .bind(order.updated_at)
    .bind(expected_status)
    .execute(&self.pool)
    .await?;
    Ok(result.rows_affected() > 0)
  }

  #[instrument(name = "PgStore::list_orders", skip(self), err(Display))]
  async fn list_orders(&self, query: &OrderListQuery) -> Result<(Vec<AdminOrderView>, i64)> {
    const FILTER: &str = "FROM orders o LEFT JOIN users u ON u.id = o.user_id
       WHERE ($1::order_status IS NULL OR o.status = $1)
         AND ($2::text IS NULL OR o.order_number ILIKE $2 OR u.name ILIKE $2 OR u.email ILIKE $2
              OR o.shipping_first_name ILIKE $2 OR o.shipping_last_name ILIKE $2)";
    let search = query.search.as_deref().filter(|s| !s.is_empty()).map(like_pattern);

    let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {}", FILTER))
      .bind(query.status)
      .bind(&search)
      .fetch_one(&self.pool)
      .await?;

    let direction = match query.sort_order {
      SortDirection::Asc => "ASC",
      SortDirection::Desc => "DESC",
    };
    let sql = format!(
      "SELECT o.* {} ORDER BY {} {}, o.id LIMIT $3 OFFSET $4",
      FILTER,
      sort_column(query.sort_by),
      direction
    );
    let orders = sqlx::query_as::<_, Order>(&sql)
      .bind(query.status)
      .bind(&search)
      .bind(query.limit)
      .bind(query.offset())
      .fetch_all(&self.pool)
      .await?;
    Ok((self.admin_views(orders).await?, total))
  }

  async fn recent_orders(&self, limit: i64) -> Result<Vec<AdminOrderView>> {
    let sql = format!("SELECT * FROM orders WHERE {} ORDER BY created_at DESC LIMIT $1", PLACED_ORDERS);
    let orders = sqlx::query_as::<_, Order>(&sql)
      .bind(limit)
      .fetch_all(&self.pool)
      .await?;
    self.admin_views(orders).await
  }

  async fn sum_revenue(&self, range: TimeRange) -> Result<i64> {
    let sql = format!(
      "SELECT COALESCE(SUM(total), 0)::BIGINT FROM orders WHERE status IN {}
       AND ($1::timestamptz IS NULL OR created_at >= $1) AND ($2::timestamptz IS NULL OR created_at < $2)",
      REVENUE_STATUSES
    );
    Ok(
      sqlx::query_scalar::<_, i64>(&sql)
        .bind(range.from)
        .bind(range.to)
        .fetch_one(&self.pool)
        .await?,
    )
  }

  async fn count_placed_orders(&self, range: TimeRange) -> Result<i64> {
    let sql = format!(
      "SELECT COUNT(*) FROM orders WHERE {}
       AND ($1::timestamptz IS NULL OR created_at >= $1) AND ($2::timestamptz IS NULL OR created_at < $2)",
      PLACED_ORDERS
    );
    Ok(
      sqlx::query_scalar::<_, i64>(&sql)
        .bind(range.from)
        .bind(range.to)
        .fetch_one(&self.pool)
        .await?,
    )
  }

  async fn count_orders_by_status(&self) -> Result<Vec<(OrderStatus, i64)>> {
    let sql = format!(
      "SELECT status, COUNT(*) FROM orders WHERE {} GROUP BY status ORDER BY status",
      PLACED_ORDERS
    );
    Ok(
      sqlx::query_as::<_, (OrderStatus, i64)>(&sql)
        .fetch_all(&self.pool)
        .await?,
    )
  }
}
