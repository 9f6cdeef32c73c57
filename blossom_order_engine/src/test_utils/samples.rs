use blossom_common::Baht;
use chrono::{TimeZone, Utc};

use crate::{
    bos_api::order_objects::{CustomerRequest, DeliveryRequest, OrderRequest},
    db_types::{
        ContactChannel,
        CustomerContact,
        DeliveryDetails,
        District,
        FulfillmentStatus,
        NewOrder,
        Order,
        OrderId,
        OrderItem,
        OrderTotals,
        PaymentMethod,
        PaymentStatus,
    },
    pricing::ItemRequest,
};

/// A pending online order for medium sunrise roses delivered to Hang Dong: 1290 + 400 = 1690 THB.
pub fn sample_order(order_id: &str) -> Order {
    let created = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
    Order {
        order_id: OrderId::from(order_id),
        customer: CustomerContact {
            name: "Ploy".into(),
            phone: "0812345678".into(),
            email: None,
            contact_channels: vec![ContactChannel::Line],
        },
        items: vec![OrderItem {
            bouquet_id: "sunrise-roses".into(),
            title: "Sunrise Roses".into(),
            size: "M".into(),
            unit_price: Baht::from(1290),
            add_ons: vec![],
            image_url: Some("/images/bouquets/sunrise-roses.jpg".into()),
        }],
        delivery: DeliveryDetails {
            address: "12 Moo 3, Hang Dong".into(),
            geo_pin: None,
            map_link: None,
            district: District::HangDong,
            is_central: false,
            delivery_window: None,
            recipient: None,
        },
        totals: OrderTotals {
            items_total: Baht::from(1290),
            delivery_fee: Baht::from(400),
            discount: Baht::zero(),
            grand_total: Baht::from(1690),
        },
        currency: "THB".into(),
        payment_method: PaymentMethod::Online,
        payment_status: PaymentStatus::PendingPayment,
        fulfillment_status: FulfillmentStatus::New,
        payment_session_id: None,
        payment_intent_id: None,
        paid_amount: None,
        paid_currency: None,
        locale: None,
        created_at: created,
        paid_at: None,
        updated_at: created,
    }
}

/// [`sample_order`] before it has been given an id.
pub fn sample_new_order() -> NewOrder {
    let order = sample_order("BLS-2026-UNUSED");
    NewOrder {
        customer: order.customer,
        items: order.items,
        delivery: order.delivery,
        totals: order.totals,
        currency: order.currency,
        payment_method: order.payment_method,
        locale: order.locale,
    }
}

/// The storefront request that prices to [`sample_order`].
pub fn sample_request() -> OrderRequest {
    OrderRequest {
        customer: CustomerRequest {
            name: "Ploy".into(),
            phone: "081-234-5678".into(),
            email: None,
            contact_channels: vec![ContactChannel::Line],
        },
        items: vec![ItemRequest::new("sunrise-roses", "M")],
        delivery: DeliveryRequest { address: Some("12 Moo 3, Hang Dong".into()), ..Default::default() },
        locale: Some("en".into()),
    }
}
