// storefront/tests/common/mod.rs
#![allow(dead_code)]

use chrono::Utc;
use eva_storefront::config::AppConfig;
use eva_storefront::models::{Address, NewAddress, Order, Role, User};
use eva_storefront::services::email_mock::MockMailer;
use eva_storefront::services::payment_gateway::PaymentProvider;
use eva_storefront::services::payment_mock::MockPaymentProvider;
use eva_storefront::services::{address_book, auth_service, catalog, webhook_signature};
use eva_storefront::state::AppState;
use eva_storefront::store::{MemoryStore, Store};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::Level;

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const BASE_URL: &str = "http://localhost:3000";

static TRACING: Lazy<()> = Lazy::new(|| {
  if std::env::var("TEST_LOG").is_ok() {
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).with_test_writer().try_init().ok();
  }
});

pub fn setup_tracing() {
  Lazy::force(&TRACING);
}

/// Application state over in-memory collaborators, with handles kept for
/// inspection.
pub struct TestApp {
  pub state: AppState,
  pub store: Arc<MemoryStore>,
  pub payments: Arc<MockPaymentProvider>,
  pub mailer: Arc<MockMailer>,
}

pub fn test_config() -> AppConfig {
  let mut config = AppConfig::for_local(BASE_URL);
  config.stripe_webhook_secret = Some(WEBHOOK_SECRET.to_string());
  config
}

pub async fn setup() -> TestApp {
  setup_with(test_config(), true).await
}

pub async fn setup_with(config: AppConfig, with_payments: bool) -> TestApp {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let raw = include_str!("../../data/catalog.json");
  let file = catalog::parse_catalog(raw).expect("bundled catalog parses");
  for category in &file.categories {
    store.upsert_category(category).await.expect("seed category");
  }
  for product in &file.products {
    store.upsert_product(product).await.expect("seed product");
  }

  let payments = Arc::new(MockPaymentProvider::new(BASE_URL));
  let mailer = Arc::new(MockMailer::new());
  let dyn_store: Arc<dyn Store> = store.clone();
  let provider: Option<Arc<dyn PaymentProvider>> = if with_payments { Some(payments.clone()) } else { None };
  let state = eva_storefront::build_app_state(dyn_store, provider, mailer.clone(), Arc::new(config));
  TestApp {
    state,
    store,
    payments,
    mailer,
  }
}

/// Creates a user directly in the store and signs them in.
pub async fn create_user(app: &TestApp, email: &str, role: Role) -> (User, String) {
  let hash = auth_service::hash_password("motdepasse").expect("hash");
  let user = User::new(Some("Léa Martin".to_string()), email.to_string(), hash, role);
  app.store.insert_user(&user).await.expect("insert user");
  let session = auth_service::issue_session(app.store.as_ref(), &user, 1).await.expect("session");
  (user, session.token)
}

pub async fn create_address(app: &TestApp, user: &User, city: &str, is_default: bool) -> Address {
  let input = NewAddress {
    first_name: Some("Léa".into()),
    last_name: Some("Martin".into()),
    address1: Some("12 rue des Lilas".into()),
    city: Some(city.into()),
    postal_code: Some("69003".into()),
    is_default,
    ..Default::default()
  };
  let address = address_book::validate_new_address(user.id, input, Utc::now()).expect("valid address");
  app.store.create_address(address).await.expect("create address")
}

pub fn bearer(token: &str) -> (&'static str, String) {
  ("Authorization", format!("Bearer {}", token))
}

pub fn completed_event(session_id: &str) -> Value {
  json!({
    "id": format!("evt_{}", session_id),
    "type": "checkout.session.completed",
    "data": { "object": {
      "id": session_id,
      "payment_intent": "pi_test_123",
      "customer_email": "lea@example.com",
      "payment_status": "paid",
    }}
  })
}

pub fn event_of_type(event_type: &str, session_id: &str) -> Value {
  json!({
    "id": "evt_other",
    "type": event_type,
    "data": { "object": { "id": session_id } }
  })
}

/// `(body, header)` for a delivery signed now with the test secret.
pub fn signed(payload: &Value) -> (Vec<u8>, String) {
  let body = serde_json::to_vec(payload).expect("serialize event");
  let header = webhook_signature::signature_header(WEBHOOK_SECRET, Utc::now().timestamp(), &body).expect("sign");
  (body, header)
}

pub async fn order_for_session(app: &TestApp, session_id: &str) -> Option<Order> {
  app.store.find_order_by_session(session_id).await.expect("store lookup")
}

/// Sends a request to a fresh service over `$state`; evaluates to
/// `(StatusCode, serde_json::Value)`.
macro_rules! send {
  ($state:expr, $req:expr) => {{
    let service = actix_web::test::init_service(
      actix_web::App::new()
        .app_data(actix_web::web::Data::new($state.clone()))
        .configure(eva_storefront::web::configure_app_routes),
    )
    .await;
    let resp = actix_web::test::call_service(&service, $req.to_request()).await;
    let status = resp.status();
    let body: serde_json::Value = actix_web::test::read_body_json(resp).await;
    (status, body)
  }};
}

pub fn checkout_request(token: &str, address_id: uuid::Uuid, items: Value) -> actix_web::test::TestRequest {
  actix_web::test::TestRequest::post()
    .uri("/api/checkout_sessions")
    .insert_header(bearer(token))
    .set_json(json!({ "items": items, "addressId": address_id }))
}

pub fn webhook_request(payload: &Value) -> actix_web::test::TestRequest {
  let (body, header) = signed(payload);
  actix_web::test::TestRequest::post()
    .uri("/api/webhooks/stripe")
    .insert_header(("stripe-signature", header))
    .set_payload(body)
}

/// Runs a checkout over HTTP and returns the payment session id.
pub async fn start_checkout(app: &TestApp, token: &str, address_id: uuid::Uuid, items: Value) -> String {
  let (status, body) = send!(app.state, checkout_request(token, address_id, items));
  assert_eq!(status, actix_web::http::StatusCode::OK, "checkout failed: {}", body);
  body["sessionId"].as_str().expect("sessionId in response").to_string()
}

/// Checkout followed by a completed-session webhook; returns the paid order.
pub async fn place_order(app: &TestApp, token: &str, address_id: uuid::Uuid, items: Value) -> Order {
  let session_id = start_checkout(app, token, address_id, items).await;
  let (status, _) = send!(app.state, webhook_request(&completed_event(&session_id)));
  assert_eq!(status, actix_web::http::StatusCode::OK);
  order_for_session(app, &session_id).await.expect("order after webhook")
}
