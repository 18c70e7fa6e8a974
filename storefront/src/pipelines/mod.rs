// storefront/src/pipelines/mod.rs

//! Workflows of the storefront, expressed as `eva_flow` pipelines.

use crate::errors::AppError;
use crate::state::AppState;
use eva_flow::Flows;
use std::sync::Arc;

pub mod contexts;

pub mod checkout_pipeline;
pub mod order_update_pipeline;
pub mod signup_pipeline;
pub mod webhook_pipeline;

/// Registers every pipeline with `flows`. Called once at startup.
pub fn register_all_pipelines(flows: &Arc<Flows<AppError>>, app_state: &AppState) {
  tracing::info!("Registering pipelines...");

  signup_pipeline::register_signup_pipeline(flows, app_state);
  checkout_pipeline::register_checkout_pipeline(flows, app_state);
  webhook_pipeline::register_webhook_pipeline(flows, app_state);
  order_update_pipeline::register_order_update_pipeline(flows, app_state);

  tracing::info!("All application pipelines registered.");
}
