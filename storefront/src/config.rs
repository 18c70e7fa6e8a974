// storefront/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentProviderKind {
  Stripe,
  Mock,
}

#[derive(Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub app_base_url: String,

  pub payment_provider: PaymentProviderKind,
  pub stripe_secret_key: Option<String>,
  pub stripe_webhook_secret: Option<String>,
  pub stripe_api_base: String,
  pub webhook_tolerance_secs: i64,
  pub currency: String,

  pub resend_api_key: Option<String>,
  pub email_from: String,
  pub email_reply_to: Option<String>,

  pub session_ttl_hours: i64,

  pub seed_db: bool,
  pub catalog_path: String,
  pub seed_admin_email: Option<String>,
  pub seed_admin_password: Option<String>,
  pub run_migrations: bool,
}

// Secrets are never printed.
impl std::fmt::Debug for AppConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AppConfig")
      .field("server_host", &self.server_host)
      .field("server_port", &self.server_port)
      .field("app_base_url", &self.app_base_url)
      .field("payment_provider", &self.payment_provider)
      .field("stripe_secret_key", &self.stripe_secret_key.as_ref().map(|_| "[REDACTED]"))
      .field("stripe_webhook_secret", &self.stripe_webhook_secret.as_ref().map(|_| "[REDACTED]"))
      .field("stripe_api_base", &self.stripe_api_base)
      .field("currency", &self.currency)
      .field("resend_configured", &self.resend_api_key.is_some())
      .field("email_from", &self.email_from)
      .field("seed_db", &self.seed_db)
      .field("run_migrations", &self.run_migrations)
      .finish_non_exhaustive()
  }
}

/// `LOG_FORMAT=json` switches the subscriber to JSON lines. Read on its own,
/// ahead of [`AppConfig::from_env`], so configuration errors are logged in
/// the chosen format.
pub fn json_logs_from_env() -> bool {
  is_json_format(env::var("LOG_FORMAT").ok().as_deref())
}

fn is_json_format(value: Option<&str>) -> bool {
  value.is_some_and(|v| v.trim().eq_ignore_ascii_case("json"))
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };
    // Unset and blank are the same thing for optional secrets.
    let get_opt = |var_name: &str| env::var(var_name).ok().filter(|v| !v.trim().is_empty());
    let parse_bool = |var_name: &str, default: &str| {
      get_env(var_name)
        .unwrap_or_else(|_| default.to_string())
        .parse::<bool>()
        .map_err(|e| AppError::Config(format!("Invalid {} value: {}", var_name, e)))
    };
    let parse_i64 = |var_name: &str, default: &str| {
      get_env(var_name)
        .unwrap_or_else(|_| default.to_string())
        .parse::<i64>()
        .map_err(|e| AppError::Config(format!("Invalid {} value: {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;
    let app_base_url = get_env("APP_BASE_URL")
      .unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port))
      .trim_end_matches('/')
      .to_string();

    let payment_provider = match get_env("PAYMENT_PROVIDER").unwrap_or_else(|_| "stripe".to_string()).as_str() {
      "stripe" => PaymentProviderKind::Stripe,
      "mock" => PaymentProviderKind::Mock,
      other => return Err(AppError::Config(format!("Invalid PAYMENT_PROVIDER value: {}", other))),
    };

    let webhook_tolerance_secs = parse_i64("WEBHOOK_TOLERANCE_SECS", "300")?;
    let session_ttl_hours = parse_i64("SESSION_TTL_HOURS", "720")?;
    if session_ttl_hours <= 0 {
      return Err(AppError::Config("SESSION_TTL_HOURS must be positive".to_string()));
    }

    let config = Self {
      server_host,
      server_port,
      database_url,
      app_base_url,
      payment_provider,
      stripe_secret_key: get_opt("STRIPE_SECRET_KEY"),
      stripe_webhook_secret: get_opt("STRIPE_WEBHOOK_SECRET"),
      stripe_api_base: get_env("STRIPE_API_BASE").unwrap_or_else(|_| "https://api.stripe.com".to_string()),
      webhook_tolerance_secs,
      currency: get_env("CURRENCY").unwrap_or_else(|_| "eur".to_string()).to_lowercase(),
      resend_api_key: get_opt("RESEND_API_KEY"),
      email_from: get_env("EMAIL_FROM").unwrap_or_else(|_| "Eva Accessories <noreply@eva-accessories.com>".to_string()),
      email_reply_to: get_opt("EMAIL_REPLY_TO"),
      session_ttl_hours,
      seed_db: parse_bool("SEED_DB", "false")?,
      catalog_path: get_env("CATALOG_PATH").unwrap_or_else(|_| "data/catalog.json".to_string()),
      seed_admin_email: get_opt("SEED_ADMIN_EMAIL"),
      seed_admin_password: get_opt("SEED_ADMIN_PASSWORD"),
      run_migrations: parse_bool("RUN_MIGRATIONS", "true")?,
    };

    tracing::info!(config = ?config, "Application configuration loaded successfully.");
    Ok(config)
  }

  /// Configuration for tests and local runs without an environment.
  pub fn for_local(app_base_url: &str) -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 8080,
      database_url: String::new(),
      app_base_url: app_base_url.trim_end_matches('/').to_string(),
      payment_provider: PaymentProviderKind::Mock,
      stripe_secret_key: None,
      stripe_webhook_secret: None,
      stripe_api_base: "https://api.stripe.com".to_string(),
      webhook_tolerance_secs: 300,
      currency: "eur".to_string(),
      resend_api_key: None,
      email_from: "Eva Accessories <noreply@eva-accessories.com>".to_string(),
      email_reply_to: None,
      session_ttl_hours: 720,
      seed_db: false,
      catalog_path: "data/catalog.json".to_string(),
      seed_admin_email: None,
      seed_admin_password: None,
      run_migrations: false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn log_format_accepts_json_only() {
    assert!(is_json_format(Some("json")));
    assert!(is_json_format(Some(" JSON ")));
    assert!(!is_json_format(Some("pretty")));
    assert!(!is_json_format(None));
  }

  #[test]
  fn local_config_trims_the_base_url() {
    let config = AppConfig::for_local("http://localhost:3000/");
    assert_eq!(config.app_base_url, "http://localhost:3000");
  }
}
