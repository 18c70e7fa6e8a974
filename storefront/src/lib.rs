// storefront/src/lib.rs

//! Eva Accessories storefront backend: catalog, address book, checkout,
//! payment webhook, customer account views and the admin dashboard API.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod store;
pub mod web;

use crate::config::{AppConfig, PaymentProviderKind};
use crate::errors::Result;
use crate::services::email::{Mailer, ResendMailer};
use crate::services::email_mock::MockMailer;
use crate::services::payment_gateway::{PaymentProvider, StripeClient};
use crate::services::payment_mock::MockPaymentProvider;
use crate::state::AppState;
use crate::store::Store;
use eva_flow::Flows;
use std::sync::Arc;

/// Assembles the shared state and registers every pipeline on it.
pub fn build_app_state(
  store: Arc<dyn Store>,
  payments: Option<Arc<dyn PaymentProvider>>,
  mailer: Arc<dyn Mailer>,
  config: Arc<AppConfig>,
) -> AppState {
  let flows = Arc::new(Flows::<errors::AppError>::new());
  let app_state = AppState {
    store,
    payments,
    mailer,
    flows: flows.clone(),
    config,
  };
  pipelines::register_all_pipelines(&flows, &app_state);
  app_state
}

/// Stripe when a secret key is configured, the in-process mock when asked
/// for, otherwise nothing (checkout then reports payment as unconfigured).
pub fn payment_provider_from_config(config: &AppConfig) -> Result<Option<Arc<dyn PaymentProvider>>> {
  match (config.payment_provider, config.stripe_secret_key.as_deref()) {
    (PaymentProviderKind::Mock, _) => {
      tracing::warn!("Using the mock payment provider.");
      Ok(Some(Arc::new(MockPaymentProvider::new(&config.app_base_url))))
    }
    (PaymentProviderKind::Stripe, Some(secret)) => {
      Ok(Some(Arc::new(StripeClient::new(&config.stripe_api_base, secret)?)))
    }
    (PaymentProviderKind::Stripe, None) => {
      tracing::warn!("STRIPE_SECRET_KEY is not set; checkout is disabled.");
      Ok(None)
    }
  }
}

/// Resend when an API key is configured, otherwise a mailer that only logs.
pub fn mailer_from_config(config: &AppConfig) -> Result<Arc<dyn Mailer>> {
  match config.resend_api_key.as_deref() {
    Some(api_key) => Ok(Arc::new(ResendMailer::new(
      api_key,
      &config.email_from,
      config.email_reply_to.clone(),
    )?)),
    None => {
      tracing::warn!("RESEND_API_KEY is not set; emails are only logged.");
      Ok(Arc::new(MockMailer::new()))
    }
  }
}
