// storefront/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use eva_storefront::config::AppConfig;
use eva_storefront::errors::{AppError, Result as AppResult};
use eva_storefront::services::{auth_service, catalog};
use eva_storefront::state::AppState;
use eva_storefront::store::{PgStore, Store};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

fn init_tracing(json_logs: bool) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  if json_logs {
    builder.json().init();
  } else {
    builder.init();
  }
}

fn io_error(err: AppError) -> std::io::Error {
  std::io::Error::other(err.to_string())
}

async fn prepare_store(config: &AppConfig) -> AppResult<Arc<dyn Store>> {
  let store = PgStore::connect(&config.database_url).await?;
  if config.run_migrations {
    store.migrate().await?;
  }

  if config.seed_db {
    catalog::seed_catalog(&store, Path::new(&config.catalog_path)).await?;
    match (config.seed_admin_email.as_deref(), config.seed_admin_password.as_deref()) {
      (Some(email), Some(password)) => {
        if auth_service::seed_admin(&store, email, password).await? {
          tracing::info!(email = %email, "Admin account seeded.");
        }
      }
      (None, None) => {}
      _ => tracing::warn!("SEED_ADMIN_EMAIL and SEED_ADMIN_PASSWORD must be set together; admin not seeded."),
    }
  }
  Ok(Arc::new(store))
}

async fn build_state(config: Arc<AppConfig>) -> AppResult<AppState> {
  let store = prepare_store(&config).await?;
  let payments = eva_storefront::payment_provider_from_config(&config)?;
  let mailer = eva_storefront::mailer_from_config(&config)?;
  Ok(eva_storefront::build_app_state(store, payments, mailer, config))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  dotenvy::dotenv().ok();
  init_tracing(eva_storefront::config::json_logs_from_env());

  tracing::info!("Starting Eva Accessories storefront server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(io_error(e));
    }
  };

  let app_state = match build_state(app_config.clone()).await {
    Ok(state) => state,
    Err(e) => {
      tracing::error!(error = %e, "Failed to initialise the application.");
      return Err(io_error(e));
    }
  };

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Binding server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(eva_storefront::web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
