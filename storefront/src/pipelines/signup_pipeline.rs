// storefront/src/pipelines/signup_pipeline.rs

use crate::errors::AppError;
use crate::models::{Role, User};
use crate::pipelines::contexts::SignupCtxData;
use crate::services::auth_service::{self, MIN_PASSWORD_LEN};
use crate::state::AppState;
use eva_flow::{ContextData, Flows, Pipeline, PipelineControl};
use std::sync::Arc;
use tracing::{event, info, warn, Level};

/// Registers the customer registration pipeline.
pub fn register_signup_pipeline(flows: &Arc<Flows<AppError>>, _app_state: &AppState) {
  let mut signup_p = Pipeline::<SignupCtxData, AppError>::new(&[
    ("validate_signup_input", false, None),
    ("check_existing_user_signup", false, None),
    ("create_user_in_db", false, None),
  ]);

  signup_p.on_root("validate_signup_input", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      guard.name = guard.name.trim().to_string();
      guard.email = guard.email.trim().to_lowercase();

      if guard.name.is_empty() || guard.email.is_empty() || guard.password.is_empty() {
        return Err(AppError::Validation("Tous les champs sont requis".to_string()));
      }
      if !guard.email.contains('@') {
        return Err(AppError::Validation("Adresse email invalide".to_string()));
      }
      if guard.password.chars().count() < MIN_PASSWORD_LEN {
        warn!("Password too short for signup.");
        return Err(AppError::Validation(format!(
          "Le mot de passe doit contenir au moins {} caractères",
          MIN_PASSWORD_LEN
        )));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  signup_p.on_root("check_existing_user_signup", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (email, store) = {
        let guard = ctx_data.read();
        (guard.email.clone(), guard.app_state.store.clone())
      };

      event!(Level::DEBUG, email = %email, "Checking if user email already exists.");
      if store.find_user_by_email(&email).await?.is_some() {
        warn!(email = %email, "Attempt to sign up with an existing email.");
        return Err(AppError::Validation("Un compte existe déjà avec cet email".to_string()));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  signup_p.on_root("create_user_in_db", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (name, email, password, store) = {
        let guard = ctx_data.read();
        (
          guard.name.clone(),
          guard.email.clone(),
          guard.password.clone(),
          guard.app_state.store.clone(),
        )
      };

      let password_hash = auth_service::hash_password(&password)?;
      let user = User::new(Some(name), email, password_hash, Role::Customer);
      // A concurrent registration with the same email is rejected here by the store.
      store.insert_user(&user).await?;
      info!(user_id = %user.id, "User created.");

      ctx_data.write().created_user = Some(user);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(signup_p);
  info!("Signup pipeline registered.");
}
