// storefront/src/pipelines/order_update_pipeline.rs

//! Admin edits of an order: status overwrite, tracking details, notes, and
//! the one-time shipping email.

use crate::errors::{AppError, Result};
use crate::pipelines::contexts::OrderUpdateCtxData;
use crate::services::{email, orders};
use crate::state::AppState;
use chrono::Utc;
use eva_flow::{ContextData, Flows, Pipeline, PipelineControl, SkipCondition};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub fn register_order_update_pipeline(flows: &Arc<Flows<AppError>>, _app_state: &AppState) {
  let no_shipping_email: SkipCondition<OrderUpdateCtxData> = Arc::new(|ctx_data: ContextData<OrderUpdateCtxData>| {
    let guard = ctx_data.read();
    match (guard.previous_status, guard.order.as_ref()) {
      (Some(previous), Some(order)) => !orders::should_notify_shipping(previous, order),
      _ => true,
    }
  });

  let mut p = Pipeline::<OrderUpdateCtxData, AppError>::new(&[
    ("load_order", false, None),
    ("apply_order_changes", false, None),
    ("persist_order", false, None),
    ("send_shipping_notification", true, Some(no_shipping_email)),
  ]);

  p.on_root("load_order", load_order);
  p.on_root("apply_order_changes", apply_order_changes);
  p.on_root("persist_order", persist_order);
  p.on_root("send_shipping_notification", send_shipping_notification);

  flows.register_pipeline(p);
  info!("Order update pipeline registered.");
}

#[instrument(name = "order_update::load_order", skip(ctx_data))]
async fn load_order(ctx_data: ContextData<OrderUpdateCtxData>) -> Result<PipelineControl> {
  let (store, order_id) = {
    let guard = ctx_data.read();
    (guard.app_state.store.clone(), guard.order_id)
  };
  let order = store
    .find_order(order_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Commande non trouvée".to_string()))?;

  let mut guard = ctx_data.write();
  guard.previous_status = Some(order.status);
  guard.order = Some(order);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "order_update::apply_order_changes", skip(ctx_data))]
async fn apply_order_changes(ctx_data: ContextData<OrderUpdateCtxData>) -> Result<PipelineControl> {
  let mut guard = ctx_data.write();
  let changes = guard.changes.clone();
  let order = guard
    .order
    .as_mut()
    .ok_or_else(|| AppError::Internal("order update context has no order".to_string()))?;
  orders::apply_order_update(order, &changes, Utc::now())?;
  Ok(PipelineControl::Continue)
}

#[instrument(name = "order_update::persist_order", skip(ctx_data))]
async fn persist_order(ctx_data: ContextData<OrderUpdateCtxData>) -> Result<PipelineControl> {
  let (store, order, previous) = {
    let guard = ctx_data.read();
    (guard.app_state.store.clone(), guard.order.clone(), guard.previous_status)
  };
  let order = order.ok_or_else(|| AppError::Internal("order update context has no order".to_string()))?;
  let previous_status =
    previous.ok_or_else(|| AppError::Internal("order update context has no previous status".to_string()))?;
  // Compare-and-set against the status seen by load_order.
  if !store.update_order(&order, previous_status).await? {
    warn!(order_number = %order.order_number, "Order changed during the edit.");
    return Err(AppError::Conflict("Commande modifiée entre-temps, veuillez réessayer".to_string()));
  }
  info!(
    order_number = %order.order_number,
    previous_status = ?previous,
    status = %order.status,
    "Order updated."
  );
  Ok(PipelineControl::Continue)
}

#[instrument(name = "order_update::send_shipping_notification", skip(ctx_data))]
async fn send_shipping_notification(ctx_data: ContextData<OrderUpdateCtxData>) -> Result<PipelineControl> {
  let (store, mailer, order) = {
    let guard = ctx_data.read();
    (guard.app_state.store.clone(), guard.app_state.mailer.clone(), guard.order.clone())
  };
  let Some(order) = order else {
    return Ok(PipelineControl::Continue);
  };
  let Some(tracking_number) = order.tracking_number.clone() else {
    return Ok(PipelineControl::Continue);
  };

  let customer = match order.user_id {
    Some(user_id) => match store.find_user(user_id).await {
      Ok(user) => user,
      Err(e) => {
        warn!(error = %e, "Could not load the customer for the shipping email.");
        None
      }
    },
    None => None,
  };
  let Some(customer) = customer else {
    warn!(order_number = %order.order_number, "No customer email for the shipping notification.");
    return Ok(PipelineControl::Continue);
  };
  let customer_name = customer
    .name
    .clone()
    .filter(|n| !n.trim().is_empty())
    .unwrap_or_else(|| order.shipping.first_name.clone());

  let message = email::shipping_notification(&customer.email, &customer_name, &order, &tracking_number);
  match mailer.send(&message).await {
    Ok(message_id) => {
      info!(order_number = %order.order_number, message_id = %message_id, "Shipping notification sent.");
      ctx_data.write().shipping_email_id = Some(message_id);
    }
    Err(e) => warn!(order_number = %order.order_number, error = %e, "Shipping notification failed."),
  }
  Ok(PipelineControl::Continue)
}
