// storefront/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use eva_flow::{ContextData, PipelineResult};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::CartLine;
use crate::pipelines::contexts::CheckoutCtxData;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequestPayload {
  #[serde(default)]
  pub items: Vec<CartLine>,
  pub address_id: Option<Uuid>,
}

#[instrument(
    name = "handler::create_checkout_session",
    skip(app_state, auth, req_payload),
    fields(user_id = %auth.user.id, lines = req_payload.items.len())
)]
pub async fn create_checkout_session_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  req_payload: web::Json<CheckoutRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let req_payload = req_payload.into_inner();
  let ctx_data = ContextData::new(CheckoutCtxData {
    app_state: app_state.get_ref().clone(),
    customer: auth.user,
    items: req_payload.items,
    address_id: req_payload.address_id,
    address: None,
    priced: None,
    order_id: Uuid::new_v4(),
    order_number: None,
    session: None,
    order: None,
  });

  match app_state.flows.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let guard = ctx_data.read();
      let session = guard.session.clone().ok_or_else(|| {
        warn!("Checkout pipeline completed without a payment session.");
        AppError::Internal("Checkout completed without a payment session.".to_string())
      })?;
      info!(
        session_id = %session.id,
        order_number = ?guard.order_number,
        "Checkout session ready."
      );
      Ok(HttpResponse::Ok().json(json!({
          "url": session.url,
          "sessionId": session.id,
      })))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Checkout pipeline was stopped by a handler.");
      Err(AppError::Internal("Checkout process was halted by an internal step.".to_string()))
    }
    Err(app_err) => Err(app_err),
  }
}
