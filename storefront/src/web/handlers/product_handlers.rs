// storefront/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::services::catalog::{ProductFilter, RELATED_PRODUCTS_LIMIT};
use crate::state::AppState;

#[derive(Deserialize, Debug, Default)]
pub struct ListProductsQuery {
  pub category: Option<String>,
  pub search: Option<String>,
  pub featured: Option<String>,
  pub limit: Option<i64>,
}

impl ListProductsQuery {
  fn filter(&self) -> ProductFilter {
    ProductFilter {
      category: self.category.clone().filter(|c| !c.is_empty()),
      search: self.search.clone().filter(|s| !s.trim().is_empty()),
      featured_only: self.featured.as_deref() == Some("true"),
      limit: self.limit.filter(|l| *l > 0),
    }
  }
}

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  query_params: web::Query<ListProductsQuery>,
) -> Result<HttpResponse, AppError> {
  let filter = query_params.filter();
  let products = app_state.store.list_products(&filter).await?;
  let categories = app_state.store.list_categories().await?;
  info!(count = products.len(), "Products listed.");

  Ok(HttpResponse::Ok().json(json!({
      "products": products,
      "categories": categories,
      "total": products.len(),
  })))
}

/// Looks a product up by slug, falling back to its id.
#[instrument(name = "handler::get_product", skip(app_state, path), fields(slug = %path.as_ref()))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let slug = path.into_inner();
  let Some(product) = app_state.store.find_product(&slug).await? else {
    warn!(slug = %slug, "Product not found.");
    return Err(AppError::NotFound("Produit non trouvé".to_string()));
  };
  let related = app_state.store.related_products(&product, RELATED_PRODUCTS_LIMIT).await?;

  Ok(HttpResponse::Ok().json(json!({
      "product": product,
      "relatedProducts": related,
  })))
}
