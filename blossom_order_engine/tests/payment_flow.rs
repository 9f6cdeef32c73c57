use std::sync::{Arc, Mutex};

use blossom_common::Baht;
use blossom_order_engine::{
    db_types::{District, FulfillmentStatus, OrderId, PaymentMethod, PaymentStatus},
    events::OrderEvent,
    order_objects::OrderRequest,
    payment_objects::{PaymentNotification, WebhookOutcome},
    pricing::{ItemRequest, PriceSchedule},
    router::StoreTopology,
    test_utils::{recording_hooks, sample_request, TestStores},
    traits::{OrderStore, PaymentEventLedger},
    OrderFlowApi,
    OrderFlowError,
    PaymentFlowApi,
    SqliteDatabase,
};
use chrono::{Duration, TimeZone, Utc};
use futures_util::future::join_all;

struct Storefront {
    stores: TestStores,
    orders: OrderFlowApi,
    payments: PaymentFlowApi<SqliteDatabase>,
    events: Arc<Mutex<Vec<OrderEvent>>>,
}

impl Storefront {
    async fn open() -> Self {
        let (hooks, events) = recording_hooks();
        let stores = TestStores::start(hooks).await;
        let router = stores.router(StoreTopology::default());
        let orders = OrderFlowApi::new(router.clone(), Arc::new(PriceSchedule::default()));
        let payments = PaymentFlowApi::new(router, stores.backends.relational.clone());
        Self { stores, orders, payments, events }
    }

    async fn event_names(&self) -> Vec<&'static str> {
        self.stores.settle().await;
        self.events.lock().unwrap().iter().map(OrderEvent::name).collect()
    }
}

#[tokio::test]
async fn pay_for_a_bouquet_delivered_to_hang_dong() {
    let shop = Storefront::open().await;
    let order = shop.orders.create_pending_order(sample_request()).await.unwrap();
    assert_eq!(order.totals.items_total, Baht::from(1290));
    assert_eq!(order.totals.delivery_fee, Baht::from(400));
    assert_eq!(order.totals.grand_total, Baht::from(1690));
    assert_eq!(order.delivery.district, District::HangDong);
    assert_eq!(order.payment_method, PaymentMethod::Online);
    assert_eq!(order.payment_status, PaymentStatus::PendingPayment);
    assert_eq!(order.customer.phone, "0812345678");

    let bound = shop.orders.attach_checkout_session(&order.order_id, "cs_test_1").await.unwrap();
    assert_eq!(bound.payment_session_id.as_deref(), Some("cs_test_1"));

    let paid_at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 45, 0).unwrap();
    let completed = PaymentNotification::succeeded("evt_1", order.order_id.clone(), paid_at)
        .with_session_id("cs_test_1")
        .with_payment_intent_id("pi_1")
        .with_amount(169_000, "thb");
    let outcome = shop.payments.process_notification(&completed).await.unwrap();
    let WebhookOutcome::Applied(paid) = outcome else {
        panic!("Expected the payment to be applied, got {outcome:?}");
    };
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert_eq!(paid.paid_at, Some(paid_at));
    assert_eq!(paid.paid_amount, Some(169_000));
    assert_eq!(paid.paid_currency.as_deref(), Some("thb"));
    assert_eq!(paid.payment_intent_id.as_deref(), Some("pi_1"));

    // The processor redelivers the same event an hour later
    let mut replay = completed.clone();
    replay.occurred_at = paid_at + Duration::hours(1);
    assert_eq!(shop.payments.process_notification(&replay).await.unwrap(), WebhookOutcome::Duplicate);
    let stored = shop.orders.fetch_order(&order.order_id).await.unwrap();
    assert_eq!(stored.paid_at, Some(paid_at));

    // A late failure event for the same order changes nothing
    let late_failure = PaymentNotification::failed("evt_2", order.order_id.clone(), paid_at + Duration::hours(2));
    let outcome = shop.payments.process_notification(&late_failure).await.unwrap();
    assert_eq!(outcome.label(), "already_paid");
    let stored = shop.orders.fetch_order(&order.order_id).await.unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Paid);

    assert_eq!(shop.event_names().await, vec!["order_paid"]);
    let mirrored = shop.stores.backends.object_store.get_order_by_id(&order.order_id).await.unwrap().unwrap();
    assert_eq!(mirrored.payment_status, PaymentStatus::Paid);
    assert_eq!(mirrored.paid_at, Some(paid_at));
}

#[tokio::test]
async fn unrecognised_addresses_pay_the_highest_fee() {
    let shop = Storefront::open().await;
    let mut request = sample_request();
    request.delivery.address = Some("the big tree by the river".into());
    let order = shop.orders.create_order(request).await.unwrap();
    assert_eq!(order.delivery.district, District::Unknown);
    assert_eq!(order.totals.delivery_fee, Baht::from(500));
    assert_eq!(order.totals.grand_total, Baht::from(1790));
}

#[tokio::test]
async fn offline_orders_notify_on_creation_and_on_manual_payment() {
    let shop = Storefront::open().await;
    let order = shop.orders.create_order(sample_request()).await.unwrap();
    assert_eq!(order.payment_method, PaymentMethod::Offline);
    assert_eq!(shop.event_names().await, vec!["order_created"]);

    let paid = shop.orders.mark_paid_manually(&order.order_id).await.unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert!(paid.paid_at.is_some());
    let again = shop.orders.mark_paid_manually(&order.order_id).await.unwrap();
    assert_eq!(again.paid_at, paid.paid_at);
    assert_eq!(shop.event_names().await, vec!["order_created", "order_paid"]);
}

#[tokio::test]
async fn a_failed_payment_can_be_retried() {
    let shop = Storefront::open().await;
    let order = shop.orders.create_pending_order(sample_request()).await.unwrap();
    let t = Utc::now();
    let failed = PaymentNotification::failed("evt_fail_1", order.order_id.clone(), t).with_session_id("cs_retry");
    let outcome = shop.payments.process_notification(&failed).await.unwrap();
    let WebhookOutcome::Applied(failed_order) = outcome else {
        panic!("Expected the failure to be applied, got {outcome:?}");
    };
    assert_eq!(failed_order.payment_status, PaymentStatus::PaymentFailed);
    assert!(failed_order.paid_at.is_none());
    assert_eq!(shop.event_names().await, vec!["payment_failed"]);

    let succeeded = PaymentNotification::succeeded("evt_ok_1", order.order_id.clone(), t + Duration::minutes(5))
        .with_session_id("cs_retry")
        .with_amount(169_000, "thb");
    let outcome = shop.payments.process_notification(&succeeded).await.unwrap();
    assert_eq!(outcome.label(), "applied");
    assert_eq!(shop.event_names().await, vec!["payment_failed", "order_paid"]);
    let events = shop.events.lock().unwrap();
    let OrderEvent::PaymentFailed(event) = &events[0] else {
        panic!("Expected a payment failure event first");
    };
    assert_eq!(event.reason, "checkout.session.async_payment_failed");
}

#[tokio::test]
async fn a_session_that_belongs_to_another_order_is_rejected() {
    let shop = Storefront::open().await;
    let first = shop.orders.create_pending_order(sample_request()).await.unwrap();
    let second = shop.orders.create_pending_order(sample_request()).await.unwrap();
    shop.orders.attach_checkout_session(&first.order_id, "cs_first").await.unwrap();

    let wrong = PaymentNotification::succeeded("evt_wrong", second.order_id.clone(), Utc::now())
        .with_session_id("cs_first")
        .with_amount(169_000, "thb");
    let err = shop.payments.process_notification(&wrong).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ConflictError(_)));
    // the ledger entry is released, so a corrected redelivery is not mistaken for a duplicate
    let ledger = &shop.stores.backends.relational;
    assert!(ledger.fetch_payment_event("evt_wrong").await.unwrap().is_none());
    let second = shop.orders.fetch_order(&second.order_id).await.unwrap();
    assert_eq!(second.payment_status, PaymentStatus::PendingPayment);

    let err = shop.orders.attach_checkout_session(&second.order_id, "cs_first").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ConflictError(_)));
    assert!(shop.event_names().await.is_empty());
}

#[tokio::test]
async fn events_for_unknown_orders_are_acknowledged() {
    let shop = Storefront::open().await;
    let ghost = PaymentNotification::succeeded("evt_ghost", OrderId::from("BLS-2026-GHOST1"), Utc::now());
    let outcome = shop.payments.process_notification(&ghost).await.unwrap();
    assert_eq!(outcome, WebhookOutcome::OrderNotFound);
    let recorded = shop.stores.backends.relational.fetch_payment_event("evt_ghost").await.unwrap().unwrap();
    assert_eq!(recorded.order_id, Some(OrderId::from("BLS-2026-GHOST1")));
    assert_eq!(shop.payments.process_notification(&ghost).await.unwrap(), WebhookOutcome::Duplicate);
}

#[tokio::test]
async fn concurrent_checkouts() {
    let shop = Storefront::open().await;
    let creations = (0..20).map(|_| shop.orders.create_pending_order(sample_request()));
    let orders = join_all(creations).await.into_iter().collect::<Result<Vec<_>, _>>().unwrap();
    let mut ids = orders.iter().map(|o| o.order_id.clone()).collect::<Vec<_>>();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 20);

    let payments = orders.iter().enumerate().map(|(i, order)| {
        let notification = PaymentNotification::succeeded(format!("evt_c{i}"), order.order_id.clone(), Utc::now())
            .with_session_id(format!("cs_c{i}"))
            .with_amount(169_000, "thb");
        let payments = shop.payments.clone();
        async move { payments.process_notification(&notification).await }
    });
    let outcomes = join_all(payments).await;
    assert!(outcomes.iter().all(|o| matches!(o, Ok(WebhookOutcome::Applied(_)))));
    let paid = shop.orders.search_orders(&Default::default()).await.unwrap();
    assert_eq!(paid.iter().filter(|o| o.is_paid()).count(), 20);
    assert_eq!(shop.event_names().await.len(), 20);
}

#[tokio::test]
async fn simultaneous_redeliveries_apply_once() {
    let shop = Storefront::open().await;
    let order = shop.orders.create_pending_order(sample_request()).await.unwrap();
    shop.orders.attach_checkout_session(&order.order_id, "cs_burst").await.unwrap();
    let paid_at = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
    let notification = PaymentNotification::succeeded("evt_burst", order.order_id.clone(), paid_at)
        .with_session_id("cs_burst")
        .with_amount(169_000, "thb");

    let deliveries = (0..8).map(|i| {
        let mut delivery = notification.clone();
        delivery.occurred_at = paid_at + Duration::seconds(i);
        let payments = shop.payments.clone();
        async move { payments.process_notification(&delivery).await }
    });
    let outcomes = join_all(deliveries).await.into_iter().collect::<Result<Vec<_>, _>>().unwrap();
    let applied = outcomes.iter().filter(|o| matches!(o, WebhookOutcome::Applied(_))).count();
    let duplicates = outcomes.iter().filter(|o| **o == WebhookOutcome::Duplicate).count();
    assert_eq!(applied, 1, "{outcomes:?}");
    assert_eq!(duplicates, 7, "{outcomes:?}");

    let stored = shop.orders.fetch_order(&order.order_id).await.unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Paid);
    let WebhookOutcome::Applied(winner) = outcomes.iter().find(|o| o.label() == "applied").unwrap() else {
        unreachable!()
    };
    assert_eq!(stored.paid_at, winner.paid_at);
    assert_eq!(shop.event_names().await, vec!["order_paid"]);
}

#[tokio::test]
async fn invalid_requests_write_nothing() {
    let shop = Storefront::open().await;
    let empty = OrderRequest { items: vec![], ..sample_request() };
    let err = shop.orders.create_order(empty).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ValidationError(_)));

    let unknown = OrderRequest { items: vec![ItemRequest::new("plastic-tulips", "M")], ..sample_request() };
    let err = shop.orders.create_pending_order(unknown).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ValidationError(_)));

    let mut bad_phone = sample_request();
    bad_phone.customer.phone = "+66 81 234".into();
    assert!(matches!(shop.orders.create_order(bad_phone).await, Err(OrderFlowError::ValidationError(_))));

    assert!(shop.orders.search_orders(&Default::default()).await.unwrap().is_empty());
    assert!(shop.event_names().await.is_empty());
}

#[tokio::test]
async fn fulfillment_and_deletion() {
    let shop = Storefront::open().await;
    let order = shop.orders.create_order(sample_request()).await.unwrap();
    let id = order.order_id.clone();
    for status in [FulfillmentStatus::Confirmed, FulfillmentStatus::Dispatched, FulfillmentStatus::Delivered] {
        let updated = shop.orders.update_fulfillment(&id, status).await.unwrap();
        assert_eq!(updated.fulfillment_status, status);
    }
    let err = shop.orders.update_fulfillment(&id, FulfillmentStatus::Confirmed).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ValidationError(_)));

    let missing = OrderId::from("BLS-2026-MISSNG");
    let err = shop.orders.update_fulfillment(&missing, FulfillmentStatus::Confirmed).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::NotFoundError(_)));

    // let the mirror catch up so that the deletion is the last thing it sees
    shop.stores.settle().await;
    shop.orders.delete_order(&id).await.unwrap();
    shop.stores.settle().await;
    assert!(matches!(shop.orders.fetch_order(&id).await, Err(OrderFlowError::NotFoundError(_))));
    assert!(matches!(shop.orders.delete_order(&id).await, Err(OrderFlowError::NotFoundError(_))));
}
