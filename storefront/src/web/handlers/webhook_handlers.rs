// storefront/src/web/handlers/webhook_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use eva_flow::ContextData;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::pipelines::contexts::{WebhookCtxData, WebhookOutcome};
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Receives payment provider events. The body is taken raw: the signature
/// covers the exact bytes sent.
#[instrument(name = "handler::stripe_webhook", skip(app_state, req, body), fields(payload_len = body.len()))]
pub async fn stripe_webhook_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  let signature_header = req
    .headers()
    .get(SIGNATURE_HEADER)
    .and_then(|h| h.to_str().ok())
    .map(String::from);

  let ctx_data = ContextData::new(WebhookCtxData {
    app_state: app_state.get_ref().clone(),
    raw_payload: body,
    signature_header,
    event_id: None,
    event_type: None,
    event_object: None,
    outcome: WebhookOutcome::Received,
    order: None,
    stock_updates: 0,
    confirmation_email_id: None,
  });

  // Stopped runs are acknowledged too: duplicates, expired sessions and
  // event types with nothing to do.
  let result = app_state.flows.run(ctx_data.clone()).await?;
  let guard = ctx_data.read();
  info!(
    result = ?result,
    outcome = ?guard.outcome,
    event_id = ?guard.event_id,
    stock_updates = guard.stock_updates,
    "Webhook processed."
  );
  Ok(HttpResponse::Ok().json(json!({ "received": true })))
}
