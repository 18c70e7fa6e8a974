// storefront/src/web/extractors.rs

//! Bearer-token authentication for handlers.

use crate::errors::AppError;
use crate::models::User;
use crate::services::auth_service;
use crate::state::AppState;
use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use tracing::{debug, warn};

/// The signed-in caller.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
  pub user: User,
}

/// A signed-in caller with an admin role.
#[derive(Debug, Clone)]
pub struct AdminUser {
  pub user: User,
}

fn unauthorized() -> AppError {
  AppError::Auth("Non autorisé".to_string())
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
  let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
  let (scheme, token) = value.split_once(' ')?;
  if !scheme.eq_ignore_ascii_case("bearer") {
    return None;
  }
  Some(token.trim().to_string()).filter(|t| !t.is_empty())
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let state = req.app_data::<web::Data<AppState>>().cloned();
    let token = bearer_token(req);
    Box::pin(async move {
      let state = state.ok_or_else(|| AppError::Internal("AppState is not registered".to_string()))?;
      let Some(token) = token else {
        debug!("Request without a bearer token.");
        return Err(unauthorized());
      };
      match auth_service::authenticate_token(state.store.as_ref(), &token).await? {
        Some(user) => Ok(AuthenticatedUser { user }),
        None => {
          warn!("Unknown or expired session token.");
          Err(unauthorized())
        }
      }
    })
  }
}

impl FromRequest for AdminUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
    let authenticated = AuthenticatedUser::from_request(req, payload);
    Box::pin(async move {
      let AuthenticatedUser { user } = authenticated.await?;
      if !user.role.is_admin() {
        warn!(user_id = %user.id, "Admin route refused to a non-admin.");
        return Err(AppError::Forbidden("Accès refusé".to_string()));
      }
      Ok(AdminUser { user })
    })
  }
}
