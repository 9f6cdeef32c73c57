use std::sync::Arc;

use actix_web::{body::to_bytes, http::StatusCode, test, test::TestRequest, web, App};
use blossom_common::Secret;
use blossom_order_engine::{
    pricing::PriceSchedule,
    router::StoreTopology,
    test_utils::{recording_hooks, TestStores},
    OrderFlowApi,
    PaymentFlowApi,
    SqliteDatabase,
};
use chrono::Utc;
use log::debug;
use serde_json::Value;

use super::mocks::MockCheckout;
use crate::{
    config::WebhookConfig,
    helpers::{signature_header, PublicLinks},
    middleware::{ADMIN_SECRET_HEADER, SIGNATURE_HEADER},
    server::configure_routes,
};

// Test-only secrets. DO NOT re-use these anywhere.
pub const WEBHOOK_SECRET: &str = "whsec_endpoint_tests";
pub const ADMIN_SECRET: &str = "admin-endpoint-tests";
pub const PUBLIC_BASE_URL: &str = "https://blossom.test";

/// Both stores on throwaway storage, and the APIs the handlers need on top of them.
pub struct TestApp {
    pub stores: TestStores,
    pub orders: OrderFlowApi,
    pub payments: PaymentFlowApi<SqliteDatabase>,
    pub links: PublicLinks,
}

impl TestApp {
    pub async fn start() -> Self {
        let (hooks, _) = recording_hooks();
        let stores = TestStores::start(hooks).await;
        let router = stores.router(StoreTopology::default());
        let orders = OrderFlowApi::new(router.clone(), Arc::new(PriceSchedule::default()));
        let payments = PaymentFlowApi::new(router, stores.backends.relational.clone());
        Self { stores, orders, payments, links: PublicLinks::new(PUBLIC_BASE_URL) }
    }

    /// Sends `req` through the full route table. Middleware rejections are rendered the way the server renders them.
    pub async fn send(&self, req: TestRequest, checkout: MockCheckout) -> (StatusCode, String) {
        let webhook = WebhookConfig { secret: Secret::new(WEBHOOK_SECRET.to_string()), ..Default::default() };
        let admin_secret = Secret::new(ADMIN_SECRET.to_string());
        let app = App::new()
            .app_data(web::Data::new(self.orders.clone()))
            .app_data(web::Data::new(self.payments.clone()))
            .app_data(web::Data::new(self.links.clone()))
            .app_data(web::Data::new(checkout))
            .configure(move |cfg| configure_routes::<MockCheckout, SqliteDatabase>(cfg, webhook, admin_secret));
        let service = test::init_service(app).await;
        let res = match test::try_call_service(&service, req.to_request()).await {
            Ok(res) => res.into_parts().1.map_into_boxed_body(),
            Err(e) => {
                debug!("Request was rejected by middleware: {e}");
                e.error_response()
            },
        };
        let status = res.status();
        let body = to_bytes(res.into_body()).await.map(|b| String::from_utf8_lossy(&b).into_owned());
        (status, body.unwrap_or_default())
    }

    pub async fn send_json(&self, req: TestRequest, checkout: MockCheckout) -> (StatusCode, Value) {
        let (status, body) = self.send(req, checkout).await;
        let json = serde_json::from_str(&body).unwrap_or_else(|e| panic!("Not JSON ({e}): {body}"));
        (status, json)
    }
}

/// A webhook delivery, signed with the test secret at the current time.
pub fn signed_webhook(body: &str) -> TestRequest {
    let header = signature_header(WEBHOOK_SECRET, Utc::now().timestamp(), body.as_bytes()).unwrap();
    TestRequest::post()
        .uri("/webhooks/payments")
        .insert_header((SIGNATURE_HEADER, header))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.to_string())
}

pub fn admin_request(req: TestRequest) -> TestRequest {
    req.insert_header((ADMIN_SECRET_HEADER, ADMIN_SECRET))
}
