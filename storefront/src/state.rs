// storefront/src/state.rs
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::email::Mailer;
use crate::services::payment_gateway::PaymentProvider;
use crate::store::Store;
use eva_flow::Flows;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn Store>,
  /// `None` when no payment credentials are configured; checkout then fails.
  pub payments: Option<Arc<dyn PaymentProvider>>,
  pub mailer: Arc<dyn Mailer>,
  pub flows: Arc<Flows<AppError>>,
  pub config: Arc<AppConfig>,
}
