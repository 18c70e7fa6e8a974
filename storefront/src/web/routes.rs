// storefront/src/web/routes.rs

use actix_web::web;

use crate::web::handlers::{
  account_handlers, address_handlers, admin_handlers, auth_handlers, checkout_handlers, product_handlers,
  webhook_handlers,
};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/auth")
          .route("/register", web::post().to(auth_handlers::register_handler))
          .route("/signin", web::post().to(auth_handlers::signin_handler)),
      )
      .service(
        web::scope("/products")
          .route("", web::get().to(product_handlers::list_products_handler))
          .route("/{slug}", web::get().to(product_handlers::get_product_handler)),
      )
      .service(
        web::scope("/addresses")
          .route("", web::get().to(address_handlers::list_addresses_handler))
          .route("", web::post().to(address_handlers::create_address_handler))
          .route("/{id}", web::get().to(address_handlers::get_address_handler))
          .route("/{id}", web::put().to(address_handlers::update_address_handler))
          .route("/{id}", web::delete().to(address_handlers::delete_address_handler)),
      )
      .route(
        "/checkout_sessions",
        web::post().to(checkout_handlers::create_checkout_session_handler),
      )
      .route(
        "/webhooks/stripe",
        web::post().to(webhook_handlers::stripe_webhook_handler),
      )
      .route(
        "/orders/by-session",
        web::get().to(account_handlers::order_by_session_handler),
      )
      .service(
        web::scope("/user")
          .route("/profile", web::get().to(account_handlers::get_profile_handler))
          .route("/profile", web::put().to(account_handlers::update_profile_handler))
          .route("/orders", web::get().to(account_handlers::list_user_orders_handler))
          .route("/orders/{id}", web::get().to(account_handlers::get_user_order_handler)),
      )
      .service(
        web::scope("/admin")
          .route("/orders", web::get().to(admin_handlers::list_orders_handler))
          .route("/orders/{id}", web::get().to(admin_handlers::get_order_handler))
          .route("/orders/{id}", web::put().to(admin_handlers::update_order_handler))
          .route("/stats", web::get().to(admin_handlers::stats_handler)),
      ),
  );
}
