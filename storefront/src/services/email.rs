// storefront/src/services/email.rs

//! Transactional email: the `Mailer` seam, the Resend client, and the two
//! messages the shop sends.

use crate::errors::{AppError, Result};
use crate::models::{Order, ShippingSnapshot};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, instrument};

pub const CARRIER: &str = "Colissimo";
const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
  pub to: String,
  pub subject: String,
  pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
  /// Returns the provider's message id.
  async fn send(&self, message: &EmailMessage) -> Result<String>;
}

pub struct ResendMailer {
  http: reqwest::Client,
  api_key: String,
  from: String,
  reply_to: Option<String>,
}

#[derive(Serialize)]
struct ResendPayload<'a> {
  from: &'a str,
  to: [&'a str; 1],
  subject: &'a str,
  html: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  reply_to: Option<&'a str>,
}

#[derive(serde::Deserialize)]
struct ResendResponse {
  id: String,
}

impl ResendMailer {
  pub fn new(api_key: &str, from: &str, reply_to: Option<String>) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(15))
      .build()
      .map_err(|e| AppError::Config(format!("Cannot build email HTTP client: {}", e)))?;
    Ok(Self {
      http,
      api_key: api_key.to_string(),
      from: from.to_string(),
      reply_to,
    })
  }
}

#[async_trait]
impl Mailer for ResendMailer {
  #[instrument(name = "ResendMailer::send", skip_all, fields(subject = %message.subject), err(Display))]
  async fn send(&self, message: &EmailMessage) -> Result<String> {
    let payload = ResendPayload {
      from: &self.from,
      to: [message.to.as_str()],
      subject: &message.subject,
      html: &message.html,
      reply_to: self.reply_to.as_deref(),
    };
    let response = self
      .http
      .post(RESEND_ENDPOINT)
      .bearer_auth(&self.api_key)
      .json(&payload)
      .send()
      .await
      .map_err(|e| AppError::Email(format!("request failed: {}", e)))?;
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(AppError::Email(format!("{}: {}", status, body)));
    }
    let sent = response
      .json::<ResendResponse>()
      .await
      .map_err(|e| AppError::Email(format!("unreadable response: {}", e)))?;
    info!(message_id = %sent.id, "Email sent.");
    Ok(sent.id)
  }
}

/// `1198` -> `11,98 €`.
pub fn format_price(minor_units: i64, currency: &str) -> String {
  let sign = if minor_units < 0 { "-" } else { "" };
  let abs = minor_units.abs();
  let symbol = match currency.to_ascii_lowercase().as_str() {
    "eur" => "€".to_string(),
    other => other.to_ascii_uppercase(),
  };
  format!("{}{},{:02} {}", sign, abs / 100, abs % 100, symbol)
}

fn escape(raw: &str) -> String {
  raw
    .replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
    .replace('"', "&quot;")
}

fn address_block(shipping: &ShippingSnapshot) -> String {
  let mut lines = vec![
    format!("{} {}", escape(&shipping.first_name), escape(&shipping.last_name)),
    escape(&shipping.address1),
  ];
  if let Some(address2) = &shipping.address2 {
    lines.push(escape(address2));
  }
  lines.push(format!("{} {}", escape(&shipping.postal_code), escape(&shipping.city)));
  lines.push(escape(&shipping.country));
  format!("<p>{}</p>", lines.join("<br>"))
}

pub fn order_confirmation(to: &str, order: &Order) -> EmailMessage {
  let rows: String = order
    .items
    .iter()
    .map(|item| {
      format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
        escape(&item.product_name),
        item.quantity,
        format_price(item.total, &order.currency)
      )
    })
    .collect();
  let html = format!(
    "<h1>Merci pour votre commande, {name} !</h1>\
     <p>Commande <strong>#{number}</strong></p>\
     <table>{rows}</table>\
     <p>Sous-total : {subtotal}<br>Livraison : {shipping}<br><strong>Total : {total}</strong></p>\
     <h2>Adresse de livraison</h2>{address}",
    name = escape(&order.shipping.first_name),
    number = escape(&order.order_number),
    rows = rows,
    subtotal = format_price(order.subtotal, &order.currency),
    shipping = if order.shipping_cost == 0 {
      "Gratuite".to_string()
    } else {
      format_price(order.shipping_cost, &order.currency)
    },
    total = format_price(order.total, &order.currency),
    address = address_block(&order.shipping),
  );
  EmailMessage {
    to: to.to_string(),
    subject: format!("Confirmation de commande #{} 🎀", order.order_number),
    html,
  }
}

pub fn default_tracking_url(tracking_number: &str) -> String {
  format!("https://www.laposte.fr/outils/suivre-vos-envois?code={}", tracking_number)
}

pub fn shipping_notification(to: &str, customer_name: &str, order: &Order, tracking_number: &str) -> EmailMessage {
  let tracking_url = order
    .tracking_url
    .clone()
    .filter(|u| !u.is_empty())
    .unwrap_or_else(|| default_tracking_url(tracking_number));
  let html = format!(
    "<h1>Bonne nouvelle, {name} !</h1>\
     <p>Votre commande <strong>#{number}</strong> a été expédiée avec {carrier}.</p>\
     <p>Numéro de suivi : <strong>{tracking}</strong></p>\
     <p><a href=\"{url}\">Suivre mon colis</a></p>\
     <h2>Adresse de livraison</h2>{address}",
    name = escape(customer_name),
    number = escape(&order.order_number),
    carrier = CARRIER,
    tracking = escape(tracking_number),
    url = escape(&tracking_url),
    address = address_block(&order.shipping),
  );
  EmailMessage {
    to: to.to_string(),
    subject: format!("Votre commande #{} est en route ! 🚚", order.order_number),
    html,
  }
}
