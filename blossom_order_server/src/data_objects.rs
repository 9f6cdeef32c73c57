use std::fmt::Display;

use blossom_order_engine::{
    db_types::{District, FulfillmentStatus, OrderId, PaymentStatus},
    traits::OrderQueryFilter,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The reply to a storefront order submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedResponse {
    pub order_id: OrderId,
    pub public_order_url: String,
    pub share_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub order_id: OrderId,
    pub checkout_url: String,
}

/// What the payment processor gets back for every delivery it should not retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
    pub outcome: String,
}

impl WebhookAck {
    pub fn new<S: Into<String>>(outcome: S) -> Self {
        Self { received: true, outcome: outcome.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentUpdate {
    pub status: FulfillmentStatus,
}

/// Query string for the admin order list, e.g. `?payment_status=paid&district=HANG_DONG&limit=20`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminOrderQuery {
    pub payment_status: Option<PaymentStatus>,
    pub fulfillment_status: Option<FulfillmentStatus>,
    pub district: Option<District>,
    pub phone: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl From<AdminOrderQuery> for OrderQueryFilter {
    fn from(q: AdminOrderQuery) -> Self {
        OrderQueryFilter {
            payment_status: q.payment_status,
            fulfillment_status: q.fulfillment_status,
            district: q.district,
            phone: q.phone,
            since: q.since,
            until: q.until,
            limit: q.limit,
        }
    }
}
