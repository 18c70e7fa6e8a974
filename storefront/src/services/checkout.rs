// storefront/src/services/checkout.rs

//! Server-side pricing of a posted cart and order numbering.

use crate::errors::{AppError, Result};
use crate::models::{CartLine, OrderItem, Product};
use chrono::{DateTime, Datelike, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// Shipping is free on every order.
pub const SHIPPING_COST: i64 = 0;

/// Upper bound on the quantity of one product in one order.
pub const MAX_LINE_QUANTITY: i32 = 999;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedCart {
  pub items: Vec<OrderItem>,
  pub subtotal: i64,
  pub shipping_cost: i64,
  pub total: i64,
}

pub fn validate_lines(lines: &[CartLine]) -> Result<()> {
  if lines.is_empty() {
    return Err(AppError::Validation("Panier vide".to_string()));
  }
  if let Some(bad) = lines.iter().find(|line| !(1..=MAX_LINE_QUANTITY).contains(&line.quantity)) {
    return Err(AppError::Validation(format!("Quantité invalide pour {}", bad.id)));
  }
  Ok(())
}

/// Prices every line from `catalog`; client-supplied prices and names are
/// ignored. Lines for the same product are merged.
pub fn price_lines(order_id: Uuid, lines: &[CartLine], catalog: &[Product]) -> Result<PricedCart> {
  validate_lines(lines)?;
  let by_id: HashMap<&str, &Product> = catalog.iter().map(|p| (p.id.as_str(), p)).collect();

  let mut items: Vec<OrderItem> = Vec::with_capacity(lines.len());
  for line in lines {
    let product = by_id
      .get(line.id.as_str())
      .filter(|p| p.is_active)
      .ok_or_else(|| AppError::Validation(format!("Produit indisponible: {}", line.id)))?;

    if let Some(existing) = items.iter_mut().find(|i| i.product_id.as_deref() == Some(product.id.as_str())) {
      existing.quantity = existing
        .quantity
        .checked_add(line.quantity)
        .filter(|q| *q <= MAX_LINE_QUANTITY)
        .ok_or_else(|| AppError::Validation(format!("Quantité invalide pour {}", line.id)))?;
      existing.total = existing.unit_price * i64::from(existing.quantity);
      continue;
    }
    items.push(OrderItem {
      id: Uuid::new_v4(),
      order_id,
      product_id: Some(product.id.clone()),
      product_name: product.name.clone(),
      product_image: product.primary_image(),
      unit_price: product.price,
      quantity: line.quantity,
      total: product.price * i64::from(line.quantity),
    });
  }

  let subtotal = items.iter().map(|i| i.total).sum();
  Ok(PricedCart {
    items,
    subtotal,
    shipping_cost: SHIPPING_COST,
    total: subtotal + SHIPPING_COST,
  })
}

/// `EVA-<year>-<sequence>`, where the sequence is the number of orders
/// already recorded plus one.
pub fn order_number(now: DateTime<Utc>, existing_orders: i64) -> String {
  format!("EVA-{}-{:05}", now.year(), existing_orders + 1)
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn product(id: &str, price: i64) -> Product {
    serde_json::from_value(serde_json::json!({
      "id": id, "slug": format!("slug-{}", id), "name": format!("Produit {}", id),
      "price": price, "category": "barrettes", "images": ["/img/a.jpg"]
    }))
    .unwrap()
  }

  fn line(id: &str, quantity: i32, client_price: Option<i64>) -> CartLine {
    CartLine {
      id: id.to_string(),
      quantity,
      name: None,
      price: client_price,
      image: None,
      description: None,
      currency: None,
    }
  }

  #[test]
  fn prices_from_catalog_not_from_client() {
    let catalog = vec![product("p1", 599)];
    let priced = price_lines(Uuid::new_v4(), &[line("p1", 2, Some(1))], &catalog).unwrap();
    assert_eq!(priced.subtotal, 1198);
    assert_eq!(priced.shipping_cost, 0);
    assert_eq!(priced.total, 1198);
    assert_eq!(priced.items[0].unit_price, 599);
    assert_eq!(priced.items[0].product_image.as_deref(), Some("/img/a.jpg"));
  }

  #[test]
  fn duplicate_lines_merge() {
    let catalog = vec![product("p1", 599), product("p2", 850)];
    let priced = price_lines(
      Uuid::new_v4(),
      &[line("p1", 1, None), line("p2", 1, None), line("p1", 2, None)],
      &catalog,
    )
    .unwrap();
    assert_eq!(priced.items.len(), 2);
    assert_eq!(priced.items[0].quantity, 3);
    assert_eq!(priced.total, 599 * 3 + 850);
  }

  #[test]
  fn rejects_empty_unknown_inactive_and_zero_quantity() {
    let mut inactive = product("p9", 100);
    inactive.is_active = false;
    let catalog = vec![product("p1", 599), inactive];
    let order_id = Uuid::new_v4();
    assert!(matches!(price_lines(order_id, &[], &catalog), Err(AppError::Validation(m)) if m == "Panier vide"));
    assert!(price_lines(order_id, &[line("nope", 1, None)], &catalog).is_err());
    assert!(price_lines(order_id, &[line("p9", 1, None)], &catalog).is_err());
    assert!(price_lines(order_id, &[line("p1", 0, None)], &catalog).is_err());
  }

  #[test]
  fn oversized_quantities_are_rejected() {
    let catalog = vec![product("p1", 599)];
    let order_id = Uuid::new_v4();
    let huge = price_lines(order_id, &[line("p1", i32::MAX, None), line("p1", i32::MAX, None)], &catalog);
    assert!(matches!(huge, Err(AppError::Validation(m)) if m == "Quantité invalide pour p1"));

    let merged = [line("p1", MAX_LINE_QUANTITY, None), line("p1", 1, None)];
    assert!(matches!(price_lines(order_id, &merged, &catalog), Err(AppError::Validation(_))));

    let priced = price_lines(order_id, &[line("p1", MAX_LINE_QUANTITY, None)], &catalog).unwrap();
    assert_eq!(priced.total, 599 * i64::from(MAX_LINE_QUANTITY));
  }

  #[test]
  fn order_numbers_are_year_scoped_and_padded() {
    let now = Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap();
    assert_eq!(order_number(now, 0), "EVA-2026-00001");
    assert_eq!(order_number(now, 41), "EVA-2026-00042");
  }
}
