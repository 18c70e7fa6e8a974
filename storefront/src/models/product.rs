// storefront/src/models/product.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

fn default_currency() -> String {
  "eur".to_string()
}

fn default_true() -> bool {
  true
}

/// A sellable item. Prices are integer minor units (cents).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: String,
  pub slug: String,
  pub name: String,
  #[serde(default)]
  pub description: String,
  pub price: i64,
  #[serde(default)]
  pub compare_at_price: Option<i64>,
  #[serde(default = "default_currency")]
  pub currency: String,
  /// Category slug.
  pub category: String,
  #[serde(default)]
  pub tags: Vec<String>,
  #[serde(default)]
  pub images: Vec<String>,
  #[serde(default)]
  pub stock: i32,
  #[serde(default = "default_true")]
  pub is_active: bool,
  #[serde(default)]
  pub is_featured: bool,
  #[serde(default = "Utc::now")]
  pub created_at: DateTime<Utc>,
  #[serde(default = "Utc::now")]
  pub updated_at: DateTime<Utc>,
}

impl Product {
  pub fn primary_image(&self) -> Option<String> {
    self.images.first().cloned()
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
  pub slug: String,
  pub name: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub sort_order: i32,
}
