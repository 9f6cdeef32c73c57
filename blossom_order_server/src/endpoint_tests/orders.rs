use actix_web::{http::StatusCode, test::TestRequest};
use blossom_order_engine::{db_types::OrderId, test_utils::sample_request};
use serde_json::json;

use super::{
    helpers::{TestApp, PUBLIC_BASE_URL},
    mocks::{working_checkout, MockCheckout},
};
use crate::integrations::stripe::CheckoutError;

#[actix_web::test]
async fn health_check() {
    let _ = env_logger::try_init().ok();
    let app = TestApp::start().await;
    let (status, body) = app.send(TestRequest::get().uri("/health"), MockCheckout::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn submit_offline_order() {
    let _ = env_logger::try_init().ok();
    let app = TestApp::start().await;
    let req = TestRequest::post().uri("/api/orders").set_json(sample_request());
    let (status, body) = app.send_json(req, MockCheckout::new()).await;
    assert_eq!(status, StatusCode::OK);
    let order_id = body["orderId"].as_str().unwrap().to_string();
    assert!(order_id.starts_with("BLS-"));
    assert_eq!(body["publicOrderUrl"], format!("{PUBLIC_BASE_URL}/orders/{order_id}"));
    assert!(body["shareText"].as_str().unwrap().contains("฿1690"));

    let order = app.orders.fetch_order(&OrderId::from(order_id)).await.unwrap();
    assert_eq!(order.totals.grand_total.value(), 1690);
    assert_eq!(order.customer.phone, "0812345678");
    app.stores.settle().await;
}

#[actix_web::test]
async fn invalid_orders_are_rejected_with_a_readable_message() {
    let _ = env_logger::try_init().ok();
    let app = TestApp::start().await;
    let mut request = sample_request();
    request.items.clear();
    let req = TestRequest::post().uri("/api/orders").set_json(request);
    let (status, body) = app.send_json(req, MockCheckout::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Your cart is empty" }));

    let mut request = sample_request();
    request.customer.phone = "+66 81 234 5678".into();
    let req = TestRequest::post().uri("/api/orders").set_json(request);
    let (status, body) = app.send_json(req, MockCheckout::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("digits"));
}

#[actix_web::test]
async fn checkout_opens_a_session_for_a_pending_order() {
    let _ = env_logger::try_init().ok();
    let app = TestApp::start().await;
    let req = TestRequest::post().uri("/api/checkout").set_json(sample_request());
    let (status, body) = app.send_json(req, working_checkout()).await;
    assert_eq!(status, StatusCode::OK);
    let order_id = OrderId::from(body["orderId"].as_str().unwrap());
    assert_eq!(body["checkoutUrl"], format!("https://checkout.test/pay/cs_{order_id}"));

    let order = app.orders.fetch_order(&order_id).await.unwrap();
    assert_eq!(order.payment_session_id, Some(format!("cs_{order_id}")));
    assert!(!order.is_paid());
    app.stores.settle().await;
}

#[actix_web::test]
async fn checkout_provider_outage_leaves_an_unpaid_order() {
    let _ = env_logger::try_init().ok();
    let app = TestApp::start().await;
    let mut checkout = MockCheckout::new();
    checkout
        .expect_create_session()
        .times(1)
        .returning(|_, _| Err(CheckoutError::Rejected { status: 503, message: "maintenance".into() }));
    let req = TestRequest::post().uri("/api/checkout").set_json(sample_request());
    let (status, body) = app.send_json(req, checkout).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(!body["error"].as_str().unwrap().contains("maintenance"));

    let orders = app.orders.search_orders(&Default::default()).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert!(orders[0].payment_session_id.is_none());
    app.stores.settle().await;
}

#[actix_web::test]
async fn checkout_without_a_provider_key() {
    let _ = env_logger::try_init().ok();
    let app = TestApp::start().await;
    let mut checkout = MockCheckout::new();
    checkout.expect_create_session().returning(|_, _| Err(CheckoutError::NotConfigured));
    let req = TestRequest::post().uri("/api/checkout").set_json(sample_request());
    let (status, _) = app.send(req, checkout).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    app.stores.settle().await;
}

#[actix_web::test]
async fn public_order_page_hides_contact_details() {
    let _ = env_logger::try_init().ok();
    let app = TestApp::start().await;
    let order = app.orders.create_order(sample_request()).await.unwrap();
    let req = TestRequest::get().uri(&format!("/api/orders/{}", order.order_id));
    let (status, body) = app.send(req, MockCheckout::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("0812345678"));
    assert!(!body.contains("12 Moo 3"));
    let view: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(view["orderId"], order.order_id.as_str());
    assert_eq!(view["paymentStatus"], "pending_payment");
    assert_eq!(view["delivery"]["district"], "HANG_DONG");
    app.stores.settle().await;
}

#[actix_web::test]
async fn unknown_orders_are_not_found() {
    let _ = env_logger::try_init().ok();
    let app = TestApp::start().await;
    let req = TestRequest::get().uri("/api/orders/BLS-2026-NOPE01");
    let (status, body) = app.send_json(req, MockCheckout::new()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}
