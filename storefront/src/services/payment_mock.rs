// storefront/src/services/payment_mock.rs
use crate::errors::{AppError, Result as AppResult};
use crate::services::payment_gateway::{CheckoutSession, CheckoutSessionRequest, PaymentProvider};
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{info, instrument};
use uuid::Uuid;

/// Issues `cs_mock_*` sessions without any network call and remembers every
/// request it was given.
pub struct MockPaymentProvider {
  checkout_base_url: String,
  requests: Mutex<Vec<(CheckoutSession, CheckoutSessionRequest)>>,
  fail_next: Mutex<bool>,
}

impl MockPaymentProvider {
  pub fn new(checkout_base_url: &str) -> Self {
    Self {
      checkout_base_url: checkout_base_url.trim_end_matches('/').to_string(),
      requests: Mutex::new(Vec::new()),
      fail_next: Mutex::new(false),
    }
  }

  pub fn sessions(&self) -> Vec<(CheckoutSession, CheckoutSessionRequest)> {
    self.requests.lock().clone()
  }

  pub fn last_session(&self) -> Option<(CheckoutSession, CheckoutSessionRequest)> {
    self.requests.lock().last().cloned()
  }

  /// The next session creation fails as if the provider were down.
  pub fn fail_next_session(&self) {
    *self.fail_next.lock() = true;
  }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
  #[instrument(name = "MockPaymentProvider::create_checkout_session", skip_all, fields(lines = request.line_items.len()))]
  async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> AppResult<CheckoutSession> {
    if std::mem::take(&mut *self.fail_next.lock()) {
      return Err(AppError::Payment("Simulated payment provider outage".to_string()));
    }
    if request.line_items.is_empty() {
      return Err(AppError::Payment("Session needs at least one line item".to_string()));
    }
    let id = format!("cs_mock_{}", Uuid::new_v4().simple());
    let session = CheckoutSession {
      url: format!("{}/mock-checkout/{}", self.checkout_base_url, id),
      id,
    };
    info!(session_id = %session.id, "Mock checkout session created.");
    self.requests.lock().push((session.clone(), request.clone()));
    Ok(session)
  }
}
