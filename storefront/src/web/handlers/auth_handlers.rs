// storefront/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use eva_flow::{ContextData, PipelineResult};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::pipelines::contexts::SignupCtxData;
use crate::services::auth_service;
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct RegisterRequestPayload {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct SigninRequestPayload {
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub password: String,
}

#[instrument(name = "handler::register", skip(app_state, req_payload), fields(req_email = %req_payload.email))]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<RegisterRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let req_payload = req_payload.into_inner();
  let ctx_data = ContextData::new(SignupCtxData {
    app_state: app_state.get_ref().clone(),
    name: req_payload.name,
    email: req_payload.email,
    password: req_payload.password,
    created_user: None,
  });

  match app_state.flows.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let user = ctx_data.read().created_user.clone().ok_or_else(|| {
        warn!("Signup pipeline completed but no user was recorded in the context.");
        AppError::Internal("Signup completed without creating a user.".to_string())
      })?;
      info!(user_id = %user.id, "Registration successful.");
      Ok(HttpResponse::Ok().json(json!({
          "success": true,
          "user": user.summary(),
      })))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Signup pipeline was stopped by a handler.");
      Err(AppError::Internal("Signup process was halted by an internal step.".to_string()))
    }
    Err(app_err) => Err(app_err),
  }
}

#[instrument(name = "handler::signin", skip(app_state, req_payload), fields(req_email = %req_payload.email))]
pub async fn signin_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SigninRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let invalid = || AppError::Auth("Email ou mot de passe incorrect".to_string());
  let email = req_payload.email.trim().to_lowercase();
  if email.is_empty() || req_payload.password.is_empty() {
    return Err(AppError::Validation("Email et mot de passe requis".to_string()));
  }

  let Some(user) = app_state.store.find_user_by_email(&email).await? else {
    warn!("Sign-in for an unknown email.");
    return Err(invalid());
  };
  if !auth_service::verify_password(&user.password_hash, &req_payload.password)? {
    warn!(user_id = %user.id, "Sign-in with a wrong password.");
    return Err(invalid());
  }

  let session = auth_service::issue_session(app_state.store.as_ref(), &user, app_state.config.session_ttl_hours).await?;
  info!(user_id = %user.id, "Sign-in successful.");
  Ok(HttpResponse::Ok().json(json!({
      "token": session.token,
      "expiresAt": session.expires_at,
      "user": {
        "id": user.id,
        "name": user.name,
        "email": user.email,
        "role": user.role,
      },
  })))
}
