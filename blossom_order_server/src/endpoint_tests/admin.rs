use actix_web::{http::StatusCode, test::TestRequest};
use blossom_order_engine::{
    db_types::{District, FulfillmentStatus, PaymentStatus},
    test_utils::sample_request,
};
use serde_json::{json, Value};

use super::{
    helpers::{admin_request, TestApp},
    mocks::MockCheckout,
};
use crate::middleware::ADMIN_SECRET_HEADER;

#[actix_web::test]
async fn admin_routes_need_the_secret() {
    let _ = env_logger::try_init().ok();
    let app = TestApp::start().await;
    let (status, body) = app.send(TestRequest::get().uri("/admin/orders"), MockCheckout::new()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Admin secret missing or invalid"));

    let req = TestRequest::get().uri("/admin/orders").insert_header((ADMIN_SECRET_HEADER, "admin-endpoint-test"));
    let (status, _) = app.send(req, MockCheckout::new()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = admin_request(TestRequest::get().uri("/admin/orders"));
    let (status, body) = app.send_json(req, MockCheckout::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[actix_web::test]
async fn list_and_filter_orders() {
    let _ = env_logger::try_init().ok();
    let app = TestApp::start().await;
    let hang_dong = app.orders.create_order(sample_request()).await.unwrap();
    let mut request = sample_request();
    request.customer.phone = "089 999 0000".into();
    request.delivery.address = Some("5 Nimman Soi 7, Mueang Chiang Mai".into());
    let mueang = app.orders.create_order(request).await.unwrap();
    app.orders.mark_paid_manually(&mueang.order_id).await.unwrap();

    let list = |uri: &str| admin_request(TestRequest::get().uri(uri));
    let (status, body) = app.send_json(list("/admin/orders"), MockCheckout::new()).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body.as_array().unwrap().iter().map(|o| o["orderId"].as_str().unwrap()).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&hang_dong.order_id.as_str()));

    let (_, body) = app.send_json(list("/admin/orders?payment_status=paid"), MockCheckout::new()).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["orderId"], mueang.order_id.as_str());

    let (_, body) = app.send_json(list("/admin/orders?district=HANG_DONG"), MockCheckout::new()).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["orderId"], hang_dong.order_id.as_str());
    assert_eq!(hang_dong.delivery.district, District::HangDong);

    // Phone filters accept the same formats as the storefront
    let (_, body) = app.send_json(list("/admin/orders?phone=089-999-0000"), MockCheckout::new()).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["orderId"], mueang.order_id.as_str());

    let (status, _) = app.send_json(list("/admin/orders?phone=%2B66899990000"), MockCheckout::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    app.stores.settle().await;
}

#[actix_web::test]
async fn fetch_a_single_order_with_contact_details() {
    let _ = env_logger::try_init().ok();
    let app = TestApp::start().await;
    let order = app.orders.create_order(sample_request()).await.unwrap();
    let req = admin_request(TestRequest::get().uri(&format!("/admin/orders/{}", order.order_id)));
    let (status, body) = app.send_json(req, MockCheckout::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["customer"]["phone"], "0812345678");
    assert_eq!(body["totals"]["grandTotal"], order.totals.grand_total.value());

    let req = admin_request(TestRequest::get().uri("/admin/orders/BLS-2026-NOPE02"));
    let (status, _) = app.send(req, MockCheckout::new()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    app.stores.settle().await;
}

#[actix_web::test]
async fn fulfillment_updates() {
    let _ = env_logger::try_init().ok();
    let app = TestApp::start().await;
    let order = app.orders.create_order(sample_request()).await.unwrap();
    let uri = format!("/admin/orders/{}/fulfillment", order.order_id);
    let req = admin_request(TestRequest::patch().uri(&uri).set_json(json!({ "status": "dispatched" })));
    let (status, body) = app.send_json(req, MockCheckout::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fulfillmentStatus"], "dispatched");
    let stored = app.orders.fetch_order(&order.order_id).await.unwrap();
    assert_eq!(stored.fulfillment_status, FulfillmentStatus::Dispatched);

    let req = admin_request(TestRequest::patch().uri(&uri).set_json(json!({ "status": "teleported" })));
    let (status, _) = app.send(req, MockCheckout::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    app.stores.settle().await;
}

#[actix_web::test]
async fn offline_payments_can_be_recorded_twice() {
    let _ = env_logger::try_init().ok();
    let app = TestApp::start().await;
    let order = app.orders.create_order(sample_request()).await.unwrap();
    let uri = format!("/admin/orders/{}/paid", order.order_id);
    let (status, first) = app.send_json(admin_request(TestRequest::post().uri(&uri)), MockCheckout::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["paymentStatus"], "paid");
    let (status, second) = app.send_json(admin_request(TestRequest::post().uri(&uri)), MockCheckout::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["paidAt"], first["paidAt"]);
    let stored = app.orders.fetch_order(&order.order_id).await.unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Paid);
    app.stores.settle().await;
}

#[actix_web::test]
async fn delete_orders() {
    let _ = env_logger::try_init().ok();
    let app = TestApp::start().await;
    let order = app.orders.create_order(sample_request()).await.unwrap();
    // The mirror copy has to exist before it can be deleted
    app.stores.settle().await;
    let uri = format!("/admin/orders/{}", order.order_id);
    let (status, body) = app.send_json(admin_request(TestRequest::delete().uri(&uri)), MockCheckout::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], Value::Bool(true));
    app.stores.settle().await;

    let (status, _) = app.send(admin_request(TestRequest::delete().uri(&uri)), MockCheckout::new()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let public = TestRequest::get().uri(&format!("/api/orders/{}", order.order_id));
    let (status, _) = app.send(public, MockCheckout::new()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
