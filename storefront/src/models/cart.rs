// storefront/src/models/cart.rs
use serde::Deserialize;

/// One line of the client-held cart as posted at checkout. Only `id` and
/// `quantity` are trusted; the descriptive fields are whatever the browser
/// cached and are ignored when pricing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
  pub id: String,
  pub quantity: i32,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub price: Option<i64>,
  #[serde(default)]
  pub image: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub currency: Option<String>,
}
