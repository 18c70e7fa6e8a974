// storefront/tests/checkout_flow_tests.rs
#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use chrono::{Datelike, Utc};
use common::*;
use eva_storefront::models::{OrderStatus, Role};
use eva_storefront::store::{Store, TimeRange};
use serde_json::json;

#[actix_web::test]
async fn checkout_then_webhook_materializes_one_paid_order() {
  let app = setup().await;
  let (user, token) = create_user(&app, "lea@example.com", Role::Customer).await;
  let address = create_address(&app, &user, "Lyon", true).await;

  // The browser's cached price is ignored.
  let (status, body) = send!(
    app.state,
    checkout_request(&token, address.id, json!([{ "id": "p1", "quantity": 2, "price": 1, "name": "Cheap" }]))
  );
  assert_eq!(status, StatusCode::OK);
  let session_id = body["sessionId"].as_str().unwrap().to_string();
  assert!(body["url"].as_str().unwrap().contains(&session_id));

  let (_, request) = app.payments.last_session().unwrap();
  assert_eq!(request.line_items.len(), 1);
  assert_eq!(request.line_items[0].unit_amount, 599);
  assert_eq!(request.line_items[0].quantity, 2);
  assert_eq!(
    request.line_items[0].image.as_deref(),
    Some("http://localhost:3000/images/products/noeud-satin-rose.jpg")
  );
  assert_eq!(request.metadata["userId"], user.id.to_string());
  assert_eq!(request.metadata["addressId"], address.id.to_string());
  assert_eq!(
    request.success_url,
    "http://localhost:3000/order/success?session_id={CHECKOUT_SESSION_ID}"
  );

  // Nothing to show on the success page until the payment is confirmed.
  let by_session = || test::TestRequest::get().uri(&format!("/api/orders/by-session?sessionId={}", session_id));
  let (status, _) = send!(app.state, by_session());
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, body) = send!(app.state, webhook_request(&completed_event(&session_id)));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "received": true }));

  let order = order_for_session(&app, &session_id).await.unwrap();
  assert_eq!(order.status, OrderStatus::Paid);
  assert_eq!(order.total, 1198);
  assert_eq!(order.subtotal, 1198);
  assert_eq!(order.shipping_cost, 0);
  assert_eq!(order.order_number, format!("EVA-{}-00001", Utc::now().year()));
  assert_eq!(order.payment_intent_id.as_deref(), Some("pi_test_123"));
  assert_eq!(order.shipping.city, "Lyon");
  assert!(order.paid_at.is_some());
  assert_eq!(order.items.len(), 1);
  assert_eq!(order.items[0].product_id.as_deref(), Some("p1"));
  assert_eq!(order.items[0].unit_price, 599);

  let (status, body) = send!(app.state, by_session());
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["orderNumber"], json!(order.order_number));
  assert_eq!(body["total"], json!(1198));
  assert_eq!(body["itemCount"], json!(1));
  assert_eq!(body["status"], json!("PAID"));
}

#[actix_web::test]
async fn duplicate_delivery_changes_nothing() {
  let app = setup().await;
  let (user, token) = create_user(&app, "lea@example.com", Role::Customer).await;
  let address = create_address(&app, &user, "Lyon", true).await;
  let session_id = start_checkout(&app, &token, address.id, json!([{ "id": "p1", "quantity": 2 }])).await;

  for _ in 0..3 {
    let (status, body) = send!(app.state, webhook_request(&completed_event(&session_id)));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], json!(true));
  }

  assert_eq!(app.store.count_orders(TimeRange::all()).await.unwrap(), 1);
  let product = app.store.find_product("p1").await.unwrap().unwrap();
  assert_eq!(product.stock, 48);
  assert_eq!(app.mailer.sent_with_subject_prefix("Confirmation de commande").len(), 1);
}

#[actix_web::test]
async fn confirmation_email_goes_to_the_session_email() {
  let app = setup().await;
  let (user, token) = create_user(&app, "lea@example.com", Role::Customer).await;
  let address = create_address(&app, &user, "Lyon", true).await;
  let session_id = start_checkout(&app, &token, address.id, json!([{ "id": "p5", "quantity": 1 }])).await;

  let mut event = completed_event(&session_id);
  event["data"]["object"]["customer_details"] = json!({ "email": "maman@example.com" });
  let (status, _) = send!(app.state, webhook_request(&event));
  assert_eq!(status, StatusCode::OK);

  let sent = app.mailer.sent_with_subject_prefix("Confirmation de commande");
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].to, "maman@example.com");
  let order = order_for_session(&app, &session_id).await.unwrap();
  assert_eq!(sent[0].subject, format!("Confirmation de commande #{} 🎀", order.order_number));
}

#[actix_web::test]
async fn lines_for_the_same_product_are_merged() {
  let app = setup().await;
  let (user, token) = create_user(&app, "lea@example.com", Role::Customer).await;
  let address = create_address(&app, &user, "Lyon", true).await;
  let order = place_order(
    &app,
    &token,
    address.id,
    json!([
      { "id": "p1", "quantity": 1 },
      { "id": "p2", "quantity": 1 },
      { "id": "p1", "quantity": 1 },
    ]),
  )
  .await;

  assert_eq!(order.items.len(), 2);
  assert_eq!(order.total, 2 * 599 + 699);
}

#[actix_web::test]
async fn stock_problems_do_not_block_the_order() {
  let app = setup().await;
  let (user, token) = create_user(&app, "lea@example.com", Role::Customer).await;
  let address = create_address(&app, &user, "Lyon", true).await;
  // p10 has 20 in stock; p2 is withdrawn before the payment lands.
  let session_id = start_checkout(
    &app,
    &token,
    address.id,
    json!([{ "id": "p10", "quantity": 25 }, { "id": "p2", "quantity": 1 }]),
  )
  .await;
  assert!(app.store.remove_product("p2"));

  let (status, body) = send!(app.state, webhook_request(&completed_event(&session_id)));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "received": true }));

  let order = order_for_session(&app, &session_id).await.unwrap();
  assert_eq!(order.status, OrderStatus::Paid);
  assert_eq!(order.items.len(), 2);
  let p10 = app.store.find_product("p10").await.unwrap().unwrap();
  assert_eq!(p10.stock, -5);
  assert!(app.store.find_product("p2").await.unwrap().is_none());
  assert_eq!(app.mailer.sent_with_subject_prefix("Confirmation de commande").len(), 1);
}

#[actix_web::test]
async fn oversized_quantities_are_rejected() {
  let app = setup().await;
  let (user, token) = create_user(&app, "lea@example.com", Role::Customer).await;
  let address = create_address(&app, &user, "Lyon", true).await;

  let (status, _) = send!(
    app.state,
    checkout_request(
      &token,
      address.id,
      json!([{ "id": "p1", "quantity": i32::MAX }, { "id": "p1", "quantity": i32::MAX }])
    )
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(app.payments.sessions().is_empty());
}

#[actix_web::test]
async fn sequence_numbers_follow_recorded_orders() {
  let app = setup().await;
  let (user, token) = create_user(&app, "lea@example.com", Role::Customer).await;
  let address = create_address(&app, &user, "Lyon", true).await;
  let first = place_order(&app, &token, address.id, json!([{ "id": "p3", "quantity": 1 }])).await;
  let second = place_order(&app, &token, address.id, json!([{ "id": "p3", "quantity": 1 }])).await;

  let year = Utc::now().year();
  assert_eq!(first.order_number, format!("EVA-{}-00001", year));
  assert_eq!(second.order_number, format!("EVA-{}-00002", year));
}

#[actix_web::test]
async fn pending_checkouts_stay_out_of_the_account() {
  let app = setup().await;
  let (user, token) = create_user(&app, "lea@example.com", Role::Customer).await;
  let address = create_address(&app, &user, "Lyon", true).await;
  start_checkout(&app, &token, address.id, json!([{ "id": "p1", "quantity": 1 }])).await;

  let (status, body) = send!(
    app.state,
    test::TestRequest::get().uri("/api/user/orders").insert_header(bearer(&token))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["orders"], json!([]));

  let placed = place_order(&app, &token, address.id, json!([{ "id": "p1", "quantity": 1 }])).await;
  let (_, body) = send!(
    app.state,
    test::TestRequest::get().uri("/api/user/orders").insert_header(bearer(&token))
  );
  let orders = body["orders"].as_array().unwrap();
  assert_eq!(orders.len(), 1);
  assert_eq!(orders[0]["orderNumber"], json!(placed.order_number));
  assert_eq!(orders[0]["itemCount"], json!(1));
}

#[actix_web::test]
async fn an_empty_cart_is_rejected() {
  let app = setup().await;
  let (user, token) = create_user(&app, "lea@example.com", Role::Customer).await;
  let address = create_address(&app, &user, "Lyon", true).await;

  let (status, body) = send!(app.state, checkout_request(&token, address.id, json!([])));
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], json!("Panier vide"));
  assert!(app.payments.sessions().is_empty());
}

#[actix_web::test]
async fn an_address_is_required() {
  let app = setup().await;
  let (_, token) = create_user(&app, "lea@example.com", Role::Customer).await;

  let (status, body) = send!(
    app.state,
    test::TestRequest::post()
      .uri("/api/checkout_sessions")
      .insert_header(bearer(&token))
      .set_json(json!({ "items": [{ "id": "p1", "quantity": 1 }] }))
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], json!("Adresse requise"));
}

#[actix_web::test]
async fn another_customers_address_is_not_found() {
  let app = setup().await;
  let (other, _) = create_user(&app, "autre@example.com", Role::Customer).await;
  let foreign = create_address(&app, &other, "Paris", true).await;
  let (_, token) = create_user(&app, "lea@example.com", Role::Customer).await;

  let (status, body) = send!(
    app.state,
    checkout_request(&token, foreign.id, json!([{ "id": "p1", "quantity": 1 }]))
  );
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["error"], json!("Adresse non trouvée"));
  assert_eq!(app.store.count_orders(TimeRange::all()).await.unwrap(), 0);
}

#[actix_web::test]
async fn unknown_products_are_rejected() {
  let app = setup().await;
  let (user, token) = create_user(&app, "lea@example.com", Role::Customer).await;
  let address = create_address(&app, &user, "Lyon", true).await;

  let (status, _) = send!(
    app.state,
    checkout_request(&token, address.id, json!([{ "id": "p999", "quantity": 1 }]))
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(app.payments.sessions().is_empty());
}

#[actix_web::test]
async fn checkout_without_a_payment_provider_fails() {
  let app = setup_with(test_config(), false).await;
  let (user, token) = create_user(&app, "lea@example.com", Role::Customer).await;
  let address = create_address(&app, &user, "Lyon", true).await;

  let (status, body) = send!(
    app.state,
    checkout_request(&token, address.id, json!([{ "id": "p1", "quantity": 1 }]))
  );
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body["error"], json!("Paiement non configuré"));
}

#[actix_web::test]
async fn a_provider_outage_records_no_order() {
  let app = setup().await;
  let (user, token) = create_user(&app, "lea@example.com", Role::Customer).await;
  let address = create_address(&app, &user, "Lyon", true).await;
  app.payments.fail_next_session();

  let (status, _) = send!(
    app.state,
    checkout_request(&token, address.id, json!([{ "id": "p1", "quantity": 1 }]))
  );
  assert_eq!(status, StatusCode::BAD_GATEWAY);
  assert_eq!(app.store.count_orders(TimeRange::all()).await.unwrap(), 0);
}

#[actix_web::test]
async fn checkout_requires_a_signed_in_customer() {
  let app = setup().await;

  let (status, body) = send!(
    app.state,
    test::TestRequest::post()
      .uri("/api/checkout_sessions")
      .set_json(json!({ "items": [{ "id": "p1", "quantity": 1 }] }))
  );
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["error"], json!("Non autorisé"));

  let (status, _) = send!(
    app.state,
    test::TestRequest::post()
      .uri("/api/checkout_sessions")
      .insert_header(bearer("not-a-token"))
      .set_json(json!({ "items": [{ "id": "p1", "quantity": 1 }] }))
  );
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn by_session_needs_a_session_id() {
  let app = setup().await;
  let (status, body) = send!(app.state, test::TestRequest::get().uri("/api/orders/by-session"));
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], json!("Session ID required"));
}
