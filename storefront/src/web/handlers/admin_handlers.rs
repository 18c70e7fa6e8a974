// storefront/src/web/handlers/admin_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use eva_flow::{ContextData, PipelineResult};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::order::AdminOrderView;
use crate::models::OrderStatus;
use crate::pipelines::contexts::OrderUpdateCtxData;
use crate::services::orders::{self, OrderUpdate};
use crate::state::AppState;
use crate::store::{OrderListQuery, OrderSortField, SortDirection};
use crate::web::extractors::AdminUser;

const MAX_PAGE_SIZE: i64 = 100;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrdersQuery {
  pub page: Option<i64>,
  pub limit: Option<i64>,
  pub status: Option<String>,
  pub search: Option<String>,
  pub sort_by: Option<String>,
  pub sort_order: Option<String>,
}

impl AdminOrdersQuery {
  /// Unknown sort fields fall back to the default ordering; an unknown
  /// status is rejected.
  pub fn to_list_query(&self) -> Result<OrderListQuery, AppError> {
    let defaults = OrderListQuery::default();
    let status = match self.status.as_deref().filter(|s| !s.is_empty() && *s != "all") {
      Some(raw) => Some(raw.parse::<OrderStatus>().map_err(|e| AppError::Validation(e.to_string()))?),
      None => None,
    };
    Ok(OrderListQuery {
      page: self.page.filter(|p| *p >= 1).unwrap_or(defaults.page),
      limit: self.limit.filter(|l| *l >= 1).map(|l| l.min(MAX_PAGE_SIZE)).unwrap_or(defaults.limit),
      status,
      search: self.search.clone().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
      sort_by: self.sort_by.as_deref().and_then(OrderSortField::parse).unwrap_or_default(),
      sort_order: match self.sort_order.as_deref() {
        Some("asc") => SortDirection::Asc,
        _ => SortDirection::Desc,
      },
    })
  }
}

#[instrument(name = "handler::admin_list_orders", skip(app_state, admin), fields(admin_id = %admin.user.id))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  query_params: web::Query<AdminOrdersQuery>,
) -> Result<HttpResponse, AppError> {
  let query = query_params.to_list_query()?;
  let (orders, total_count) = app_state.store.list_orders(&query).await?;
  let total_pages = (total_count + query.limit - 1) / query.limit;

  Ok(HttpResponse::Ok().json(json!({
      "orders": orders,
      "pagination": {
        "page": query.page,
        "limit": query.limit,
        "totalCount": total_count,
        "totalPages": total_pages,
      },
  })))
}

async fn admin_view(app_state: &AppState, order_id: Uuid) -> Result<AdminOrderView, AppError> {
  let order = app_state
    .store
    .find_order(order_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Commande non trouvée".to_string()))?;
  let customer = match order.user_id {
    Some(user_id) => app_state.store.find_user(user_id).await?.map(|u| u.summary()),
    None => None,
  };
  Ok(AdminOrderView { order, customer })
}

#[instrument(name = "handler::admin_get_order", skip(app_state, admin), fields(admin_id = %admin.user.id))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let view = admin_view(app_state.get_ref(), path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(view))
}

#[instrument(name = "handler::admin_update_order", skip(app_state, admin, body), fields(admin_id = %admin.user.id))]
pub async fn update_order_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
  body: web::Json<OrderUpdate>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let ctx_data = ContextData::new(OrderUpdateCtxData {
    app_state: app_state.get_ref().clone(),
    order_id,
    changes: body.into_inner(),
    previous_status: None,
    order: None,
    shipping_email_id: None,
  });

  match app_state.flows.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let email_sent = ctx_data.read().shipping_email_id.is_some();
      info!(order_id = %order_id, shipping_email_sent = email_sent, "Order update completed.");
      let view = admin_view(app_state.get_ref(), order_id).await?;
      Ok(HttpResponse::Ok().json(view))
    }
    Ok(PipelineResult::Stopped) => {
      warn!(order_id = %order_id, "Order update pipeline was stopped by a handler.");
      Err(AppError::Internal("Order update was halted by an internal step.".to_string()))
    }
    Err(app_err) => Err(app_err),
  }
}

#[instrument(name = "handler::admin_stats", skip(app_state, admin), fields(admin_id = %admin.user.id))]
pub async fn stats_handler(app_state: web::Data<AppState>, admin: AdminUser) -> Result<HttpResponse, AppError> {
  let stats = orders::dashboard_stats(app_state.store.as_ref(), Utc::now()).await?;
  Ok(HttpResponse::Ok().json(stats))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn list_query_defaults_and_clamps() {
    let query = AdminOrdersQuery {
      limit: Some(500),
      sort_by: Some("bogus".into()),
      ..Default::default()
    }
    .to_list_query()
    .unwrap();
    assert_eq!(query.page, 1);
    assert_eq!(query.limit, MAX_PAGE_SIZE);
    assert_eq!(query.sort_by, OrderSortField::CreatedAt);
    assert_eq!(query.sort_order, SortDirection::Desc);
  }

  #[test]
  fn list_query_rejects_unknown_status() {
    let query = AdminOrdersQuery {
      status: Some("LOST".into()),
      ..Default::default()
    };
    assert!(matches!(query.to_list_query(), Err(AppError::Validation(_))));

    let all = AdminOrdersQuery {
      status: Some("all".into()),
      sort_order: Some("asc".into()),
      ..Default::default()
    }
    .to_list_query()
    .unwrap();
    assert_eq!(all.status, None);
    assert_eq!(all.sort_order, SortDirection::Asc);
  }
}
