// storefront/src/services/email_mock.rs
use crate::errors::{AppError, Result as AppResult};
use crate::services::email::{EmailMessage, Mailer};
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

#[derive(Debug, Clone)]
pub struct SentEmailInfo {
  pub to: String,
  pub subject: String,
  pub body_preview: String,
  pub message_id: String,
}

/// Used when no email provider is configured: logs and keeps every message
/// so tests can inspect what would have been sent.
#[derive(Default)]
pub struct MockMailer {
  sent: Mutex<Vec<SentEmailInfo>>,
  fail_all: Mutex<bool>,
}

impl MockMailer {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn sent(&self) -> Vec<SentEmailInfo> {
    self.sent.lock().clone()
  }

  pub fn sent_with_subject_prefix(&self, prefix: &str) -> Vec<SentEmailInfo> {
    self.sent.lock().iter().filter(|m| m.subject.starts_with(prefix)).cloned().collect()
  }

  /// Makes every later send fail, as an unreachable provider would.
  pub fn set_failing(&self, failing: bool) {
    *self.fail_all.lock() = failing;
  }
}

#[async_trait]
impl Mailer for MockMailer {
  async fn send(&self, message: &EmailMessage) -> AppResult<String> {
    info!(to = %message.to, subject = %message.subject, "Simulating sending email");
    if *self.fail_all.lock() {
      tracing::warn!(subject = %message.subject, "Simulated email failure");
      return Err(AppError::Email("Simulated email send failure".to_string()));
    }
    let body_preview = message.html.chars().take(50).collect::<String>() + "...";
    let message_id = format!("mock_email_{}", uuid::Uuid::new_v4());
    self.sent.lock().push(SentEmailInfo {
      to: message.to.clone(),
      subject: message.subject.clone(),
      body_preview,
      message_id: message_id.clone(),
    });
    Ok(message_id)
  }
}
