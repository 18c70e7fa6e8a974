// storefront/src/web/handlers/address_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{AddressPatch, NewAddress};
use crate::services::address_book;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

fn not_found() -> AppError {
  AppError::NotFound("Adresse non trouvée".to_string())
}

#[instrument(name = "handler::list_addresses", skip(app_state, auth), fields(user_id = %auth.user.id))]
pub async fn list_addresses_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let addresses = app_state.store.list_addresses(auth.user.id).await?;
  Ok(HttpResponse::Ok().json(addresses))
}

#[instrument(name = "handler::create_address", skip(app_state, auth, body), fields(user_id = %auth.user.id))]
pub async fn create_address_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  body: web::Json<NewAddress>,
) -> Result<HttpResponse, AppError> {
  let address = address_book::validate_new_address(auth.user.id, body.into_inner(), Utc::now())?;
  let created = app_state.store.create_address(address).await?;
  info!(address_id = %created.id, is_default = created.is_default, "Address created.");
  Ok(HttpResponse::Created().json(created))
}

#[instrument(name = "handler::get_address", skip(app_state, auth), fields(user_id = %auth.user.id))]
pub async fn get_address_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let address = app_state
    .store
    .find_address(auth.user.id, path.into_inner())
    .await?
    .ok_or_else(not_found)?;
  Ok(HttpResponse::Ok().json(address))
}

#[instrument(name = "handler::update_address", skip(app_state, auth, body), fields(user_id = %auth.user.id))]
pub async fn update_address_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
  body: web::Json<AddressPatch>,
) -> Result<HttpResponse, AppError> {
  let updated = app_state
    .store
    .update_address(auth.user.id, path.into_inner(), &body)
    .await?
    .ok_or_else(not_found)?;
  info!(address_id = %updated.id, is_default = updated.is_default, "Address updated.");
  Ok(HttpResponse::Ok().json(updated))
}

#[instrument(name = "handler::delete_address", skip(app_state, auth), fields(user_id = %auth.user.id))]
pub async fn delete_address_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let address_id = path.into_inner();
  if !app_state.store.delete_address(auth.user.id, address_id).await? {
    return Err(not_found());
  }
  info!(address_id = %address_id, "Address deleted.");
  Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
