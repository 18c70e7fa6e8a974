// storefront/src/pipelines/webhook_pipeline.rs

//! Payment provider callbacks. A completed checkout session moves its
//! `PENDING` order to `PAID` exactly once, however often it is delivered.

use crate::errors::{AppError, Result};
use crate::models::OrderStatus;
use crate::pipelines::contexts::{WebhookCtxData, WebhookOutcome};
use crate::services::{email, webhook_signature};
use crate::state::AppState;
use chrono::Utc;
use eva_flow::{ContextData, Flows, Pipeline, PipelineControl};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

pub const SESSION_COMPLETED: &str = "checkout.session.completed";
pub const SESSION_EXPIRED: &str = "checkout.session.expired";

#[derive(Debug, Deserialize)]
struct EventEnvelope {
  id: String,
  #[serde(rename = "type")]
  event_type: String,
  data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
  object: Value,
}

pub fn register_webhook_pipeline(flows: &Arc<Flows<AppError>>, _app_state: &AppState) {
  let mut p = Pipeline::<WebhookCtxData, AppError>::new(&[
    ("verify_webhook_signature", false, None),
    ("parse_webhook_event", false, None),
    ("route_webhook_event", false, None),
    ("materialize_order", false, None),
    ("decrement_stock", true, None),
    ("send_order_confirmation", true, None),
  ]);

  p.on_root("verify_webhook_signature", verify_webhook_signature);
  p.on_root("parse_webhook_event", parse_webhook_event);
  p.on_root("route_webhook_event", route_webhook_event);
  p.on_root("materialize_order", materialize_order);
  p.on_root("decrement_stock", decrement_stock);
  p.on_root("send_order_confirmation", send_order_confirmation);

  flows.register_pipeline(p);
  info!("Payment webhook pipeline registered.");
}

#[instrument(name = "webhook::verify_webhook_signature", skip(ctx_data))]
async fn verify_webhook_signature(ctx_data: ContextData<WebhookCtxData>) -> Result<PipelineControl> {
  let guard = ctx_data.read();
  let Some(header) = guard.signature_header.as_deref() else {
    warn!("Webhook delivery without a signature header.");
    return Err(AppError::Signature("No signature".to_string()));
  };
  let Some(secret) = guard.app_state.config.stripe_webhook_secret.as_deref() else {
    error!("Webhook secret is not configured.");
    return Err(AppError::Config("Webhook not configured".to_string()));
  };
  webhook_signature::verify(
    header,
    &guard.raw_payload,
    secret,
    Utc::now().timestamp(),
    guard.app_state.config.webhook_tolerance_secs,
  )?;
  Ok(PipelineControl::Continue)
}

#[instrument(name = "webhook::parse_webhook_event", skip(ctx_data))]
async fn parse_webhook_event(ctx_data: ContextData<WebhookCtxData>) -> Result<PipelineControl> {
  let envelope: EventEnvelope = {
    let guard = ctx_data.read();
    serde_json::from_slice(&guard.raw_payload)
      .map_err(|e| AppError::Validation(format!("Invalid webhook payload: {}", e)))?
  };
  info!(event_id = %envelope.id, event_type = %envelope.event_type, "Webhook event received.");

  let mut guard = ctx_data.write();
  guard.event_id = Some(envelope.id);
  guard.event_type = Some(envelope.event_type);
  guard.event_object = Some(envelope.data.object);
  Ok(PipelineControl::Continue)
}

fn session_id_of(object: &Value) -> Option<String> {
  object.get("id").and_then(Value::as_str).map(str::to_string)
}

#[instrument(name = "webhook::route_webhook_event", skip(ctx_data))]
async fn route_webhook_event(ctx_data: ContextData<WebhookCtxData>) -> Result<PipelineControl> {
  let (store, event_type, object) = {
    let guard = ctx_data.read();
    (
      guard.app_state.store.clone(),
      guard.event_type.clone().unwrap_or_default(),
      guard.event_object.clone().unwrap_or(Value::Null),
    )
  };

  match event_type.as_str() {
    SESSION_COMPLETED => Ok(PipelineControl::Continue),
    SESSION_EXPIRED => {
      let Some(session_id) = session_id_of(&object) else {
        warn!("Expired session event without an id.");
        ctx_data.write().outcome = WebhookOutcome::Ignored;
        return Ok(PipelineControl::Stop);
      };
      let cancelled = store.cancel_pending_order(&session_id).await?;
      info!(session_id = %session_id, cancelled, "Checkout session expired.");
      ctx_data.write().outcome = WebhookOutcome::Expired;
      Ok(PipelineControl::Stop)
    }
    "payment_intent.succeeded" | "payment_intent.payment_failed" => {
      info!(
        event_type = %event_type,
        payment_intent = ?session_id_of(&object),
        "Payment intent event acknowledged."
      );
      ctx_data.write().outcome = WebhookOutcome::Ignored;
      Ok(PipelineControl::Stop)
    }
    other => {
      info!(event_type = %other, "Unhandled webhook event type.");
      ctx_data.write().outcome = WebhookOutcome::Ignored;
      Ok(PipelineControl::Stop)
    }
  }
}

#[instrument(name = "webhook::materialize_order", skip(ctx_data))]
async fn materialize_order(ctx_data: ContextData<WebhookCtxData>) -> Result<PipelineControl> {
  let (store, object) = {
    let guard = ctx_data.read();
    (guard.app_state.store.clone(), guard.event_object.clone().unwrap_or(Value::Null))
  };
  let Some(session_id) = session_id_of(&object) else {
    warn!("Completed session event without an id.");
    ctx_data.write().outcome = WebhookOutcome::Ignored;
    return Ok(PipelineControl::Stop);
  };

  match store.find_order_by_session(&session_id).await? {
    None => {
      error!(session_id = %session_id, "No order recorded for completed session.");
      ctx_data.write().outcome = WebhookOutcome::UnknownSession;
      return Ok(PipelineControl::Stop);
    }
    Some(order) if order.status != OrderStatus::Pending => {
      info!(session_id = %session_id, order_number = %order.order_number, "Order already exists for session.");
      ctx_data.write().outcome = WebhookOutcome::AlreadyMaterialized;
      return Ok(PipelineControl::Stop);
    }
    Some(_) => {}
  }

  let payment_intent = object.get("payment_intent").and_then(Value::as_str);
  let Some(order) = store.mark_order_paid(&session_id, payment_intent, Utc::now()).await? else {
    // A concurrent delivery got there first.
    info!(session_id = %session_id, "Order was materialized by a concurrent delivery.");
    ctx_data.write().outcome = WebhookOutcome::AlreadyMaterialized;
    return Ok(PipelineControl::Stop);
  };
  info!(order_number = %order.order_number, order_id = %order.id, total = order.total, "Order created.");

  let mut guard = ctx_data.write();
  guard.outcome = WebhookOutcome::Materialized;
  guard.order = Some(order);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "webhook::decrement_stock", skip(ctx_data))]
async fn decrement_stock(ctx_data: ContextData<WebhookCtxData>) -> Result<PipelineControl> {
  let (store, items) = {
    let guard = ctx_data.read();
    let items = guard.order.as_ref().map(|o| o.items.clone()).unwrap_or_default();
    (guard.app_state.store.clone(), items)
  };

  let mut updated = 0;
  for item in &items {
    let Some(product_id) = item.product_id.as_deref() else {
      continue;
    };
    match store.decrement_stock(product_id, item.quantity).await {
      Ok(Some(remaining)) if remaining < 0 => {
        warn!(product_id, remaining, "Stock went negative after order.");
        updated += 1;
      }
      Ok(Some(_)) => updated += 1,
      Ok(None) => warn!(product_id, "Failed to update stock: product no longer exists."),
      Err(e) => warn!(product_id, error = %e, "Failed to update stock."),
    }
  }

  ctx_data.write().stock_updates = updated;
  Ok(PipelineControl::Continue)
}

#[instrument(name = "webhook::send_order_confirmation", skip(ctx_data))]
async fn send_order_confirmation(ctx_data: ContextData<WebhookCtxData>) -> Result<PipelineControl> {
  let (store, mailer, order, object) = {
    let guard = ctx_data.read();
    (
      guard.app_state.store.clone(),
      guard.app_state.mailer.clone(),
      guard.order.clone(),
      guard.event_object.clone().unwrap_or(Value::Null),
    )
  };
  let Some(order) = order else {
    return Ok(PipelineControl::Continue);
  };

  let from_session = object
    .pointer("/customer_details/email")
    .and_then(Value::as_str)
    .or_else(|| object.get("customer_email").and_then(Value::as_str))
    .map(str::to_string);
  let recipient = match (from_session, order.user_id) {
    (Some(email), _) => Some(email),
    (None, Some(user_id)) => match store.find_user(user_id).await {
      Ok(user) => user.map(|u| u.email),
      Err(e) => {
        warn!(error = %e, "Could not load the customer for the confirmation email.");
        None
      }
    },
    (None, None) => None,
  };
  let Some(recipient) = recipient else {
    warn!(order_number = %order.order_number, "No recipient for the confirmation email.");
    return Ok(PipelineControl::Continue);
  };

  match mailer.send(&email::order_confirmation(&recipient, &order)).await {
    Ok(message_id) => {
      info!(order_number = %order.order_number, message_id = %message_id, "Confirmation email sent.");
      ctx_data.write().confirmation_email_id = Some(message_id);
    }
    Err(e) => warn!(order_number = %order.order_number, error = %e, "Confirmation email failed."),
  }
  Ok(PipelineControl::Continue)
}
