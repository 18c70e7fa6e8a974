// storefront/src/pipelines/contexts.rs

//! Data carried through each pipeline. Handlers receive these wrapped in
//! `eva_flow::ContextData`.

use crate::models::{Address, CartLine, Order, OrderStatus, User};
use crate::services::checkout::PricedCart;
use crate::services::orders::OrderUpdate;
use crate::services::payment_gateway::CheckoutSession;
use crate::state::AppState;
use serde_json::Value;
use uuid::Uuid;

#[derive(Clone)]
pub struct SignupCtxData {
  pub app_state: AppState,
  pub name: String,
  pub email: String,
  pub password: String,
  pub created_user: Option<User>,
}

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub customer: User,
  pub items: Vec<CartLine>,
  pub address_id: Option<Uuid>,
  pub address: Option<Address>,
  pub priced: Option<PricedCart>,
  pub order_id: Uuid,
  pub order_number: Option<String>,
  pub session: Option<CheckoutSession>,
  pub order: Option<Order>,
}

/// How a webhook delivery ended, for the response and the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
  Received,
  Materialized,
  AlreadyMaterialized,
  UnknownSession,
  Expired,
  Ignored,
}

#[derive(Clone)]
pub struct WebhookCtxData {
  pub app_state: AppState,
  pub raw_payload: actix_web::web::Bytes,
  pub signature_header: Option<String>,
  pub event_id: Option<String>,
  pub event_type: Option<String>,
  /// `data.object` of the event envelope.
  pub event_object: Option<Value>,
  pub outcome: WebhookOutcome,
  pub order: Option<Order>,
  pub stock_updates: usize,
  pub confirmation_email_id: Option<String>,
}

#[derive(Clone)]
pub struct OrderUpdateCtxData {
  pub app_state: AppState,
  pub order_id: Uuid,
  pub changes: OrderUpdate,
  pub previous_status: Option<OrderStatus>,
  pub order: Option<Order>,
  pub shipping_email_id: Option<String>,
}
