// storefront/src/services/payment_gateway.rs

//! Hosted checkout sessions. `StripeClient` talks to the Stripe REST API;
//! `payment_mock::MockPaymentProvider` stands in for it locally and in tests.

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{error, info, instrument};

pub const MAX_METADATA_KEYS: usize = 50;
pub const MAX_METADATA_KEY_LEN: usize = 40;
pub const MAX_METADATA_VALUE_LEN: usize = 500;

/// Product images are stored as site-relative paths; hosted checkout needs
/// absolute URLs.
pub fn absolute_image_url(base_url: &str, image: &str) -> Option<String> {
  let image = image.trim();
  if image.is_empty() {
    None
  } else if image.starts_with("http://") || image.starts_with("https://") {
    Some(image.to_string())
  } else {
    Some(format!("{}/{}", base_url.trim_end_matches('/'), image.trim_start_matches('/')))
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLineItem {
  pub name: String,
  pub description: Option<String>,
  pub image: Option<String>,
  /// Minor units.
  pub unit_amount: i64,
  pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
  pub currency: String,
  pub line_items: Vec<SessionLineItem>,
  pub customer_email: Option<String>,
  pub success_url: String,
  pub cancel_url: String,
  /// Offer the free shipping rate on the hosted page.
  pub free_shipping: bool,
  pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
  pub id: String,
  pub url: String,
}

/// Rejects metadata the provider would refuse.
pub fn validate_metadata(metadata: &BTreeMap<String, String>) -> Result<()> {
  if metadata.len() > MAX_METADATA_KEYS {
    return Err(AppError::Payment(format!("metadata has {} keys", metadata.len())));
  }
  for (key, value) in metadata {
    if key.chars().count() > MAX_METADATA_KEY_LEN {
      return Err(AppError::Payment(format!("metadata key '{}' is too long", key)));
    }
    if value.chars().count() > MAX_METADATA_VALUE_LEN {
      return Err(AppError::Payment(format!("metadata value for '{}' is too long", key)));
    }
  }
  Ok(())
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
  async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> Result<CheckoutSession>;
}

pub struct StripeClient {
  http: reqwest::Client,
  api_base: String,
  secret_key: String,
}

#[derive(Deserialize)]
struct StripeErrorBody {
  error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
  message: Option<String>,
}

impl StripeClient {
  pub fn new(api_base: &str, secret_key: &str) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(15))
      .build()
      .map_err(|e| AppError::Config(format!("Cannot build payment HTTP client: {}", e)))?;
    Ok(Self {
      http,
      api_base: api_base.trim_end_matches('/').to_string(),
      secret_key: secret_key.to_string(),
    })
  }

  /// Stripe's form encoding of a Checkout Session.
  pub fn form_fields(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut fields = vec![
      ("mode".to_string(), "payment".to_string()),
      ("success_url".to_string(), request.success_url.clone()),
      ("cancel_url".to_string(), request.cancel_url.clone()),
      ("payment_method_types[0]".to_string(), "card".to_string()),
      ("shipping_address_collection[allowed_countries][0]".to_string(), "FR".to_string()),
    ];
    if let Some(email) = &request.customer_email {
      fields.push(("customer_email".to_string(), email.clone()));
    }
    for (i, item) in request.line_items.iter().enumerate() {
      let prefix = format!("line_items[{}]", i);
      fields.push((format!("{}[quantity]", prefix), item.quantity.to_string()));
      fields.push((format!("{}[price_data][currency]", prefix), request.currency.clone()));
      fields.push((format!("{}[price_data][unit_amount]", prefix), item.unit_amount.to_string()));
      fields.push((format!("{}[price_data][product_data][name]", prefix), item.name.clone()));
      if let Some(description) = item.description.as_ref().filter(|d| !d.is_empty()) {
        fields.push((format!("{}[price_data][product_data][description]", prefix), description.clone()));
      }
      if let Some(image) = item.image.as_ref().filter(|i| i.starts_with("http")) {
        fields.push((format!("{}[price_data][product_data][images][0]", prefix), image.clone()));
      }
    }
    if request.free_shipping {
      let rate = "shipping_options[0][shipping_rate_data]";
      fields.push((format!("{}[type]", rate), "fixed_amount".to_string()));
      fields.push((format!("{}[fixed_amount][amount]", rate), "0".to_string()));
      fields.push((format!("{}[fixed_amount][currency]", rate), request.currency.clone()));
      fields.push((format!("{}[display_name]", rate), "Livraison gratuite".to_string()));
    }
    for (key, value) in &request.metadata {
      fields.push((format!("metadata[{}]", key), value.clone()));
    }
    fields
  }
}

#[async_trait]
impl PaymentProvider for StripeClient {
  #[instrument(name = "StripeClient::create_checkout_session", skip_all, fields(lines = request.line_items.len()), err(Display))]
  async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> Result<CheckoutSession> {
    let response = self
      .http
      .post(format!("{}/v1/checkout/sessions", self.api_base))
      .bearer_auth(&self.secret_key)
      .form(&Self::form_fields(request))
      .send()
      .await
      .map_err(|e| AppError::Payment(format!("request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
      let message = response
        .json::<StripeErrorBody>()
        .await
        .ok()
        .and_then(|body| body.error.message)
        .unwrap_or_else(|| "unknown error".to_string());
      error!(%status, %message, "Checkout session creation rejected.");
      return Err(AppError::Payment(format!("{}: {}", status, message)));
    }

    let session = response
      .json::<CheckoutSession>()
      .await
      .map_err(|e| AppError::Payment(format!("unreadable session response: {}", e)))?;
    info!(session_id = %session.id, "Checkout session created.");
    Ok(session)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn request() -> CheckoutSessionRequest {
    CheckoutSessionRequest {
      currency: "eur".into(),
      line_items: vec![SessionLineItem {
        name: "Nœud Satin Rose XL".into(),
        description: None,
        image: Some("/images/products/noeud-satin-rose.jpg".into()),
        unit_amount: 599,
        quantity: 2,
      }],
      customer_email: Some("lea@example.com".into()),
      success_url: "http://shop/order/success?session_id={CHECKOUT_SESSION_ID}".into(),
      cancel_url: "http://shop/checkout".into(),
      free_shipping: true,
      metadata: BTreeMap::from([("orderNumber".to_string(), "EVA-2026-00001".to_string())]),
    }
  }

  #[test]
  fn form_fields_encode_lines_shipping_and_metadata() {
    let fields = StripeClient::form_fields(&request());
    let get = |k: &str| fields.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
    assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("599"));
    assert_eq!(get("line_items[0][quantity]"), Some("2"));
    assert_eq!(get("shipping_options[0][shipping_rate_data][fixed_amount][amount]"), Some("0"));
    assert_eq!(get("metadata[orderNumber]"), Some("EVA-2026-00001"));
    // Relative paths are resolved before the request is built.
    assert_eq!(get("line_items[0][price_data][product_data][images][0]"), None);
  }

  #[test]
  fn image_paths_are_joined_with_the_site_url() {
    assert_eq!(
      absolute_image_url("http://shop/", "/images/a.jpg").as_deref(),
      Some("http://shop/images/a.jpg")
    );
    assert_eq!(
      absolute_image_url("http://shop", "https://cdn.example.com/a.jpg").as_deref(),
      Some("https://cdn.example.com/a.jpg")
    );
    assert_eq!(absolute_image_url("http://shop", "  "), None);
  }

  #[test]
  fn metadata_limits_are_enforced() {
    let mut metadata = BTreeMap::new();
    metadata.insert("k".repeat(41), "v".into());
    assert!(validate_metadata(&metadata).is_err());

    let mut metadata = BTreeMap::new();
    metadata.insert("itemsJson".into(), "x".repeat(501));
    assert!(validate_metadata(&metadata).is_err());

    let metadata: BTreeMap<String, String> = (0..51).map(|i| (format!("k{}", i), "v".to_string())).collect();
    assert!(validate_metadata(&metadata).is_err());

    assert!(validate_metadata(&request().metadata).is_ok());
  }
}
