// storefront/src/pipelines/checkout_pipeline.rs

//! Turns a posted cart and a chosen address into a hosted payment session
//! and a `PENDING` order waiting for the payment webhook.

use crate::errors::{AppError, Result};
use crate::models::{Order, OrderStatus, ShippingSnapshot};
use crate::pipelines::contexts::CheckoutCtxData;
use crate::services::checkout as pricing;
use crate::services::payment_gateway::{absolute_image_url, validate_metadata, CheckoutSessionRequest, SessionLineItem};
use crate::state::AppState;
use crate::store::TimeRange;
use chrono::Utc;
use eva_flow::{ContextData, Flows, Pipeline, PipelineControl};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub fn register_checkout_pipeline(flows: &Arc<Flows<AppError>>, _app_state: &AppState) {
  let mut p = Pipeline::<CheckoutCtxData, AppError>::new(&[
    ("validate_checkout_request", false, None),
    ("load_shipping_address", false, None),
    ("price_cart_lines", false, None),
    ("assign_order_number", false, None),
    ("create_payment_session", false, None),
    ("persist_pending_order", false, None),
  ]);

  p.on_root("validate_checkout_request", validate_checkout_request);
  p.on_root("load_shipping_address", load_shipping_address);
  p.on_root("price_cart_lines", price_cart_lines);
  p.on_root("assign_order_number", assign_order_number);
  p.on_root("create_payment_session", create_payment_session);
  p.on_root("persist_pending_order", persist_pending_order);

  flows.register_pipeline(p);
  info!("Checkout pipeline registered.");
}

#[instrument(name = "checkout::validate_checkout_request", skip(ctx_data))]
async fn validate_checkout_request(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl> {
  let guard = ctx_data.read();
  pricing::validate_lines(&guard.items)?;
  if guard.address_id.is_none() {
    return Err(AppError::Validation("Adresse requise".to_string()));
  }
  if guard.app_state.payments.is_none() {
    return Err(AppError::Config("Paiement non configuré".to_string()));
  }
  debug!(lines = guard.items.len(), "Checkout request is well formed.");
  Ok(PipelineControl::Continue)
}

#[instrument(name = "checkout::load_shipping_address", skip(ctx_data))]
async fn load_shipping_address(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl> {
  let (store, user_id, address_id) = {
    let guard = ctx_data.read();
    (guard.app_state.store.clone(), guard.customer.id, guard.address_id)
  };
  let address_id = address_id.ok_or_else(|| AppError::Validation("Adresse requise".to_string()))?;

  // Someone else's address id looks exactly like a missing one.
  let address = store
    .find_address(user_id, address_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Adresse non trouvée".to_string()))?;

  ctx_data.write().address = Some(address);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "checkout::price_cart_lines", skip(ctx_data))]
async fn price_cart_lines(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl> {
  let (store, lines, order_id) = {
    let guard = ctx_data.read();
    (guard.app_state.store.clone(), guard.items.clone(), guard.order_id)
  };
  let ids: Vec<String> = lines.iter().map(|line| line.id.clone()).collect();
  let products = store.find_products_by_ids(&ids).await?;
  let priced = pricing::price_lines(order_id, &lines, &products)?;
  info!(subtotal = priced.subtotal, total = priced.total, "Cart priced.");

  ctx_data.write().priced = Some(priced);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "checkout::assign_order_number", skip(ctx_data))]
async fn assign_order_number(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl> {
  let store = ctx_data.read().app_state.store.clone();
  let existing = store.count_orders(TimeRange::all()).await?;
  let number = pricing::order_number(Utc::now(), existing);
  debug!(order_number = %number, "Order number assigned.");

  ctx_data.write().order_number = Some(number);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "checkout::create_payment_session", skip(ctx_data))]
async fn create_payment_session(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl> {
  let (payments, request) = {
    let guard = ctx_data.read();
    let payments = guard
      .app_state
      .payments
      .clone()
      .ok_or_else(|| AppError::Config("Paiement non configuré".to_string()))?;
    (payments, session_request(&guard)?)
  };
  validate_metadata(&request.metadata)?;

  let session = payments.create_checkout_session(&request).await?;
  info!(session_id = %session.id, "Payment session created.");
  ctx_data.write().session = Some(session);
  Ok(PipelineControl::Continue)
}

fn session_request(ctx: &CheckoutCtxData) -> Result<CheckoutSessionRequest> {
  let priced = ctx.priced.as_ref().ok_or_else(|| missing("priced cart"))?;
  let order_number = ctx.order_number.as_ref().ok_or_else(|| missing("order number"))?;
  let address_id = ctx.address_id.ok_or_else(|| missing("address id"))?;
  let base = &ctx.app_state.config.app_base_url;

  let line_items = priced
    .items
    .iter()
    .map(|item| SessionLineItem {
      name: item.product_name.clone(),
      description: None,
      image: item.product_image.as_deref().and_then(|image| absolute_image_url(base, image)),
      unit_amount: item.unit_price,
      quantity: item.quantity,
    })
    .collect();

  let mut metadata = BTreeMap::new();
  metadata.insert("orderId".to_string(), ctx.order_id.to_string());
  metadata.insert("orderNumber".to_string(), order_number.clone());
  metadata.insert("userId".to_string(), ctx.customer.id.to_string());
  metadata.insert("addressId".to_string(), address_id.to_string());

  Ok(CheckoutSessionRequest {
    currency: ctx.app_state.config.currency.clone(),
    line_items,
    customer_email: Some(ctx.customer.email.clone()),
    success_url: format!("{}/order/success?session_id={{CHECKOUT_SESSION_ID}}", base),
    cancel_url: format!("{}/checkout", base),
    free_shipping: priced.shipping_cost == 0,
    metadata,
  })
}

#[instrument(name = "checkout::persist_pending_order", skip(ctx_data))]
async fn persist_pending_order(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl> {
  let (store, order) = {
    let guard = ctx_data.read();
    (guard.app_state.store.clone(), pending_order(&guard)?)
  };
  store.insert_order(&order).await?;
  info!(order_id = %order.id, order_number = %order.order_number, "Pending order recorded.");

  ctx_data.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

fn pending_order(ctx: &CheckoutCtxData) -> Result<Order> {
  let priced = ctx.priced.as_ref().ok_or_else(|| missing("priced cart"))?;
  let address = ctx.address.as_ref().ok_or_else(|| missing("shipping address"))?;
  let session = ctx.session.as_ref().ok_or_else(|| missing("payment session"))?;
  let order_number = ctx.order_number.clone().ok_or_else(|| missing("order number"))?;
  let now = Utc::now();

  Ok(Order {
    id: ctx.order_id,
    order_number,
    user_id: Some(ctx.customer.id),
    status: OrderStatus::Pending,
    shipping: ShippingSnapshot::from(address),
    subtotal: priced.subtotal,
    shipping_cost: priced.shipping_cost,
    discount: 0,
    total: priced.total,
    currency: ctx.app_state.config.currency.clone(),
    payment_session_id: session.id.clone(),
    payment_intent_id: None,
    tracking_number: None,
    tracking_url: None,
    customer_note: None,
    internal_note: None,
    paid_at: None,
    shipped_at: None,
    delivered_at: None,
    created_at: now,
    updated_at: now,
    items: priced.items.clone(),
  })
}

fn missing(what: &str) -> AppError {
  AppError::Internal(format!("checkout context is missing the {}", what))
}
