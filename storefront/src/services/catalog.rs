// storefront/src/services/catalog.rs

//! Catalog queries that do not depend on the storage backend, plus seeding
//! from the bundled JSON catalog.

use crate::errors::{AppError, Result};
use crate::models::{Category, Product};
use crate::store::Store;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, instrument};

pub const RELATED_PRODUCTS_LIMIT: i64 = 4;
pub const LOW_STOCK_THRESHOLD: i32 = 5;

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
  pub category: Option<String>,
  pub search: Option<String>,
  pub featured_only: bool,
  pub limit: Option<i64>,
}

impl ProductFilter {
  /// Case-insensitive match on name, description or any tag, for active
  /// products only.
  pub fn matches(&self, product: &Product) -> bool {
    if !product.is_active {
      return false;
    }
    if let Some(category) = &self.category {
      if &product.category != category {
        return false;
      }
    }
    if self.featured_only && !product.is_featured {
      return false;
    }
    match self.search.as_deref().map(str::to_lowercase) {
      Some(needle) if !needle.is_empty() => {
        product.name.to_lowercase().contains(&needle)
          || product.description.to_lowercase().contains(&needle)
          || product.tags.iter().any(|tag| tag.to_lowercase().contains(&needle))
      }
      _ => true,
    }
  }

  /// Applies the filter and limit to an already ordered product list.
  pub fn apply(&self, products: impl IntoIterator<Item = Product>) -> Vec<Product> {
    let limit = self.limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
    products.into_iter().filter(|p| self.matches(p)).take(limit).collect()
  }
}

#[derive(Debug, Deserialize)]
pub struct CatalogFile {
  pub categories: Vec<Category>,
  pub products: Vec<Product>,
}

pub fn parse_catalog(raw: &str) -> Result<CatalogFile> {
  serde_json::from_str(raw).map_err(|e| AppError::Config(format!("Invalid catalog file: {}", e)))
}

/// Upserts every category and product of the catalog file at `path`.
#[instrument(name = "catalog::seed", skip(store), err(Display))]
pub async fn seed_catalog(store: &dyn Store, path: &Path) -> Result<(usize, usize)> {
  let raw = tokio::fs::read_to_string(path)
    .await
    .map_err(|e| AppError::Config(format!("Cannot read catalog {}: {}", path.display(), e)))?;
  let catalog = parse_catalog(&raw)?;
  for category in &catalog.categories {
    store.upsert_category(category).await?;
  }
  for product in &catalog.products {
    store.upsert_product(product).await?;
  }
  info!(
    categories = catalog.categories.len(),
    products = catalog.products.len(),
    "Catalog seeded."
  );
  Ok((catalog.categories.len(), catalog.products.len()))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn bundled() -> CatalogFile {
    parse_catalog(include_str!("../../data/catalog.json")).unwrap()
  }

  #[test]
  fn bundled_catalog_parses_with_defaults() {
    let catalog = bundled();
    assert_eq!(catalog.categories.len(), 6);
    let p1 = catalog.products.iter().find(|p| p.id == "p1").unwrap();
    assert_eq!(p1.price, 599);
    assert_eq!(p1.currency, "eur");
    assert!(p1.is_active);
  }

  #[test]
  fn search_hits_name_description_and_tags() {
    let products = bundled().products;
    let by_tag = ProductFilter {
      search: Some("NACRE".into()),
      ..Default::default()
    };
    let hits = by_tag.apply(products.clone());
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].slug, "barrette-perle-elegante");

    let by_description = ProductFilter {
      search: Some("strass".into()),
      ..Default::default()
    };
    assert_eq!(by_description.apply(products)[0].slug, "diademe-princesse");
  }

  #[test]
  fn category_featured_and_limit_combine() {
    let mut products = bundled().products;
    products[0].is_active = false;
    let filter = ProductFilter {
      category: Some("noeuds-rubans".into()),
      ..Default::default()
    };
    let hits = filter.apply(products.clone());
    assert_eq!(hits.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), vec!["p2"]);

    let featured = ProductFilter {
      featured_only: true,
      limit: Some(2),
      ..Default::default()
    };
    let hits = featured.apply(products);
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|p| p.is_featured));
  }
}
