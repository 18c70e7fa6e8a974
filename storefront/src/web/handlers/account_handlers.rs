// storefront/src/web/handlers/account_handlers.rs

//! Profile and order views of the signed-in customer.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Order;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct ProfileUpdatePayload {
  pub name: Option<String>,
  pub phone: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BySessionQuery {
  #[serde(alias = "session_id")]
  pub session_id: Option<String>,
}

fn order_summary(order: &Order) -> Value {
  json!({
      "id": order.id,
      "orderNumber": order.order_number,
      "status": order.status,
      "total": order.total,
      "itemCount": order.item_count(),
      "items": order.items.iter().map(|item| json!({
          "id": item.id,
          "name": item.product_name,
          "quantity": item.quantity,
          "price": item.unit_price,
          "image": item.product_image,
      })).collect::<Vec<_>>(),
      "trackingNumber": order.tracking_number,
      "trackingUrl": order.tracking_url,
      "createdAt": order.created_at,
      "paidAt": order.paid_at,
      "shippedAt": order.shipped_at,
      "deliveredAt": order.delivered_at,
  })
}

#[instrument(name = "handler::get_profile", skip(app_state, auth), fields(user_id = %auth.user.id))]
pub async fn get_profile_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let user = auth.user;
  let order_count = app_state
    .store
    .list_user_orders(user.id)
    .await?
    .iter()
    .filter(|o| o.is_placed())
    .count();
  let address_count = app_state.store.list_addresses(user.id).await?.len();

  Ok(HttpResponse::Ok().json(json!({
      "id": user.id,
      "name": user.name,
      "email": user.email,
      "phone": user.phone,
      "image": user.image,
      "createdAt": user.created_at,
      "orderCount": order_count,
      "addressCount": address_count,
  })))
}

#[instrument(name = "handler::update_profile", skip(app_state, auth, body), fields(user_id = %auth.user.id))]
pub async fn update_profile_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  body: web::Json<ProfileUpdatePayload>,
) -> Result<HttpResponse, AppError> {
  let body = body.into_inner();
  let user = app_state
    .store
    .update_profile(auth.user.id, body.name, body.phone)
    .await?
    .ok_or_else(|| AppError::NotFound("Utilisateur non trouvé".to_string()))?;
  info!("Profile updated.");

  Ok(HttpResponse::Ok().json(json!({
      "id": user.id,
      "name": user.name,
      "email": user.email,
      "phone": user.phone,
      "image": user.image,
  })))
}

#[instrument(name = "handler::list_user_orders", skip(app_state, auth), fields(user_id = %auth.user.id))]
pub async fn list_user_orders_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders: Vec<Value> = app_state
    .store
    .list_user_orders(auth.user.id)
    .await?
    .iter()
    .filter(|o| o.is_placed())
    .map(order_summary)
    .collect();
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

#[instrument(name = "handler::get_user_order", skip(app_state, auth), fields(user_id = %auth.user.id))]
pub async fn get_user_order_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .store
    .find_order(path.into_inner())
    .await?
    .filter(|o| o.user_id == Some(auth.user.id) && o.is_placed())
    .ok_or_else(|| AppError::NotFound("Commande non trouvée".to_string()))?;
  Ok(HttpResponse::Ok().json(order))
}

/// What the success page shows after the payment redirect. Answers 404 until
/// the webhook has materialized the order.
#[instrument(name = "handler::order_by_session", skip(app_state))]
pub async fn order_by_session_handler(
  app_state: web::Data<AppState>,
  query: web::Query<BySessionQuery>,
) -> Result<HttpResponse, AppError> {
  let Some(session_id) = query.session_id.as_deref().filter(|s| !s.is_empty()) else {
    return Err(AppError::Validation("Session ID required".to_string()));
  };
  let order = app_state
    .store
    .find_order_by_session(session_id)
    .await?
    .filter(Order::is_placed)
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

  Ok(HttpResponse::Ok().json(json!({
      "orderNumber": order.order_number,
      "total": order.total,
      "itemCount": order.item_count(),
      "status": order.status,
  })))
}
