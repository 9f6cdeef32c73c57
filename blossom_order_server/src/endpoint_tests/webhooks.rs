use actix_web::{http::StatusCode, test::TestRequest};
use blossom_order_engine::{
    db_types::{Order, OrderId, PaymentStatus},
    test_utils::sample_request,
};
use serde_json::{json, Value};

use super::{
    helpers::{signed_webhook, TestApp},
    mocks::{working_checkout, MockCheckout},
};
use crate::middleware::SIGNATURE_HEADER;

fn completed_session(event_id: &str, order_id: &OrderId, session_id: &str) -> String {
    json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "created": chrono::Utc::now().timestamp(),
        "data": { "object": {
            "id": session_id,
            "object": "checkout.session",
            "payment_status": "paid",
            "payment_intent": "pi_endpoint_1",
            "amount_total": 169_000,
            "currency": "thb",
            "metadata": { "order_id": order_id.as_str() },
        }},
    })
    .to_string()
}

async fn checkout_order(app: &TestApp) -> Order {
    let req = TestRequest::post().uri("/api/checkout").set_json(sample_request());
    let (status, body) = app.send_json(req, working_checkout()).await;
    assert_eq!(status, StatusCode::OK);
    let order_id = OrderId::from(body["orderId"].as_str().unwrap());
    app.orders.fetch_order(&order_id).await.unwrap()
}

#[actix_web::test]
async fn unsigned_deliveries_are_rejected() {
    let _ = env_logger::try_init().ok();
    let app = TestApp::start().await;
    let order = checkout_order(&app).await;
    let body = completed_session("evt_unsigned", &order.order_id, "cs_x");
    let req = TestRequest::post().uri("/webhooks/payments").set_payload(body.clone());
    let (status, text) = app.send(req, MockCheckout::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(text.contains("Signature invalid"));

    let forged = format!("t={},v1={}", chrono::Utc::now().timestamp(), "ab".repeat(32));
    let req = TestRequest::post().uri("/webhooks/payments").insert_header((SIGNATURE_HEADER, forged)).set_payload(body);
    let (status, _) = app.send(req, MockCheckout::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let order = app.orders.fetch_order(&order.order_id).await.unwrap();
    assert_eq!(order.payment_status, PaymentStatus::PendingPayment);
    app.stores.settle().await;
}

#[actix_web::test]
async fn a_paid_checkout_marks_the_order_paid_once() {
    let _ = env_logger::try_init().ok();
    let app = TestApp::start().await;
    let order = checkout_order(&app).await;
    let session_id = order.payment_session_id.clone().unwrap();
    let body = completed_session("evt_paid_1", &order.order_id, &session_id);

    let (status, ack) = app.send_json(signed_webhook(&body), MockCheckout::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, json!({ "received": true, "outcome": "applied" }));
    let paid = app.orders.fetch_order(&order.order_id).await.unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert_eq!(paid.payment_intent_id.as_deref(), Some("pi_endpoint_1"));
    assert!(paid.paid_at.is_some());

    // The processor redelivers the same event
    let (status, ack) = app.send_json(signed_webhook(&body), MockCheckout::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "duplicate");

    // A different event for an order that is already paid
    let body = completed_session("evt_paid_2", &order.order_id, &session_id);
    let (status, ack) = app.send_json(signed_webhook(&body), MockCheckout::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "already_paid");
    app.stores.settle().await;
}

#[actix_web::test]
async fn events_for_unknown_orders_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let app = TestApp::start().await;
    let body = completed_session("evt_lost_1", &OrderId::from("BLS-2026-LOST01"), "cs_lost");
    let (status, ack) = app.send_json(signed_webhook(&body), MockCheckout::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "order_not_found");
}

#[actix_web::test]
async fn unrelated_events_are_ignored() {
    let _ = env_logger::try_init().ok();
    let app = TestApp::start().await;
    let body = json!({
        "id": "evt_customer_1",
        "type": "customer.created",
        "created": chrono::Utc::now().timestamp(),
        "data": { "object": { "id": "cus_1", "object": "customer" } },
    })
    .to_string();
    let (status, ack) = app.send_json(signed_webhook(&body), MockCheckout::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, json!({ "received": true, "outcome": "ignored" }));
}

#[actix_web::test]
async fn malformed_events_are_rejected() {
    let _ = env_logger::try_init().ok();
    let app = TestApp::start().await;
    let body = completed_session("evt_bad_1", &OrderId::from("BLS-2026-BAD001"), "cs_bad");
    let mut event: Value = serde_json::from_str(&body).unwrap();
    event["data"]["object"]["metadata"] = json!({});
    let (status, _) = app.send_json(signed_webhook(&event.to_string()), MockCheckout::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send_json(signed_webhook("{\"id\": 12"), MockCheckout::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn a_session_belonging_to_another_order_is_a_conflict() {
    let _ = env_logger::try_init().ok();
    let app = TestApp::start().await;
    let first = checkout_order(&app).await;
    let second = checkout_order(&app).await;
    let stolen_session = first.payment_session_id.clone().unwrap();
    let body = completed_session("evt_mixup_1", &second.order_id, &stolen_session);
    let (status, _) = app.send_json(signed_webhook(&body), MockCheckout::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let second = app.orders.fetch_order(&second.order_id).await.unwrap();
    assert_eq!(second.payment_status, PaymentStatus::PendingPayment);

    // The ledger entry was released, so a corrected redelivery with the same event id still goes through
    let body = completed_session("evt_mixup_1", &second.order_id, second.payment_session_id.as_deref().unwrap());
    let (status, ack) = app.send_json(signed_webhook(&body), MockCheckout::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "applied");
    app.stores.settle().await;
}
