//! Stripe Checkout integration.
//!
//! Two halves:
//! * [`StripeCheckout`] opens hosted checkout sessions for pending orders. The order id travels with the session as
//!   `metadata[order_id]` (on the session and on its payment intent), which is how webhook deliveries find their way
//!   back to the order.
//! * [`classify_event`] turns a verified webhook delivery into a [`PaymentNotification`] for the engine, or decides
//!   that the event is none of our business.
use std::collections::HashMap;

use blossom_common::Baht;
use blossom_order_engine::{
    db_types::{Order, OrderId},
    payment_objects::{PaymentNotification, PaymentResult},
};
use chrono::{DateTime, TimeZone, Utc};
use log::*;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::StripeConfig;

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const ASYNC_PAYMENT_SUCCEEDED: &str = "checkout.session.async_payment_succeeded";
pub const ASYNC_PAYMENT_FAILED: &str = "checkout.session.async_payment_failed";
pub const SESSION_EXPIRED: &str = "checkout.session.expired";
pub const PAYMENT_INTENT_FAILED: &str = "payment_intent.payment_failed";

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("No payment provider key has been configured")]
    NotConfigured,
    #[error("Could not reach the payment provider. {0}")]
    RequestFailed(String),
    #[error("The payment provider refused the request ({status}). {message}")]
    Rejected { status: u16, message: String },
    #[error("The payment provider sent an unexpected response. {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for CheckoutError {
    fn from(e: reqwest::Error) -> Self {
        CheckoutError::RequestFailed(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Where the customer lands after paying or giving up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLinks {
    pub success_url: String,
    pub cancel_url: String,
}

/// Opens a hosted payment page for an order.
#[allow(async_fn_in_trait)]
pub trait CheckoutProvider {
    async fn create_session(&self, order: &Order, links: &CheckoutLinks) -> Result<CheckoutSession, CheckoutError>;
}

#[derive(Debug, Clone)]
pub struct StripeCheckout {
    client: Client,
    config: StripeConfig,
}

impl StripeCheckout {
    pub fn new(client: Client, config: StripeConfig) -> Self {
        Self { client, config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.api_url.trim_end_matches('/'))
    }
}

impl CheckoutProvider for StripeCheckout {
    async fn create_session(&self, order: &Order, links: &CheckoutLinks) -> Result<CheckoutSession, CheckoutError> {
        let key = self.config.secret_key.reveal();
        if key.is_empty() {
            return Err(CheckoutError::NotConfigured);
        }
        let params = checkout_form(order, links);
        trace!("💳️ Opening a checkout session for order [{}]", order.order_id);
        let response = self.client.post(self.url("/checkout/sessions")).bearer_auth(key).form(&params).send().await?;
        let status = response.status();
        if status.is_success() {
            let session = response.json::<CheckoutSession>().await.map_err(|e| {
                CheckoutError::InvalidResponse(format!("Could not read the checkout session. {e}"))
            })?;
            debug!("💳️ Checkout session {} opened for order [{}]", session.id, order.order_id);
            Ok(session)
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(CheckoutError::Rejected { status: status.as_u16(), message })
        }
    }
}

/// Checkout only knows `th`, `en` and friends. Anything it does not know is left for it to guess.
fn checkout_locale(locale: Option<&str>) -> &'static str {
    match locale.map(|l| l.trim().to_ascii_lowercase()) {
        Some(l) if l.starts_with("th") => "th",
        Some(l) if l.starts_with("en") => "en",
        _ => "auto",
    }
}

fn push_line(params: &mut Vec<(String, String)>, index: usize, name: String, amount: Baht, currency: &str) {
    let prefix = format!("line_items[{index}]");
    params.push((format!("{prefix}[price_data][currency]"), currency.to_string()));
    params.push((format!("{prefix}[price_data][product_data][name]"), name));
    params.push((format!("{prefix}[price_data][unit_amount]"), amount.to_satang().to_string()));
    params.push((format!("{prefix}[quantity]"), "1".to_string()));
}

/// The form body for `POST /v1/checkout/sessions`. Amounts are taken from the stored order, never from the caller.
pub fn checkout_form(order: &Order, links: &CheckoutLinks) -> Vec<(String, String)> {
    let currency = order.currency.to_ascii_lowercase();
    let order_id = order.order_id.to_string();
    let mut params = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), links.success_url.clone()),
        ("cancel_url".to_string(), links.cancel_url.clone()),
        ("client_reference_id".to_string(), order_id.clone()),
        ("metadata[order_id]".to_string(), order_id.clone()),
        ("payment_intent_data[metadata][order_id]".to_string(), order_id),
        ("locale".to_string(), checkout_locale(order.locale.as_deref()).to_string()),
    ];
    if let Some(email) = &order.customer.email {
        params.push(("customer_email".to_string(), email.clone()));
    }
    if order.totals.discount.value() != 0 {
        // Line items cannot be negative, so a discounted order is charged as a single line
        push_line(&mut params, 0, format!("Blossom order {}", order.order_id), order.totals.grand_total, &currency);
        return params;
    }
    for (i, item) in order.items.iter().enumerate() {
        let mut name = format!("{} ({})", item.title, item.size);
        if !item.add_ons.is_empty() {
            let labels = item.add_ons.iter().map(|a| a.label.as_str()).collect::<Vec<_>>().join(", ");
            name = format!("{name} + {labels}");
        }
        push_line(&mut params, i, name, item.line_total(), &currency);
    }
    if order.totals.delivery_fee.value() > 0 {
        let name = format!("Delivery ({})", order.delivery.district);
        push_line(&mut params, order.items.len(), name, order.totals.delivery_fee, &currency);
    }
    params
}

//--------------------------------------------   Webhook events   ------------------------------------------------------
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    /// Unix seconds
    pub created: i64,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

/// The fields of a checkout session or payment intent that the engine cares about.
#[derive(Debug, Clone, Default, Deserialize)]
struct EventObject {
    id: String,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, Value>,
    /// A plain id, or the whole intent when the event was expanded
    #[serde(default)]
    payment_intent: Option<Value>,
    #[serde(default)]
    amount_total: Option<i64>,
    #[serde(default)]
    amount: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
}

impl EventObject {
    fn order_id(&self) -> Option<OrderId> {
        self.metadata.get("order_id").and_then(Value::as_str).filter(|s| !s.trim().is_empty()).map(OrderId::from)
    }

    fn payment_intent_id(&self) -> Option<String> {
        match self.payment_intent.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Object(o) => o.get("id").and_then(Value::as_str).map(String::from),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("The event payload is not a valid event. {0}")]
    InvalidPayload(String),
    #[error("Event {0} does not carry metadata.order_id")]
    MissingOrderId(String),
    #[error("Event {0} has an invalid creation time")]
    InvalidTimestamp(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventClass {
    Payment(PaymentNotification),
    /// Acknowledged without touching any order. Carries the reason for the logs.
    Ignored(String),
}

pub fn parse_event(body: &[u8]) -> Result<StripeEvent, EventError> {
    serde_json::from_slice(body).map_err(|e| EventError::InvalidPayload(e.to_string()))
}

/// Decides what a delivery means for the engine. Only events that carry a payment result for one of our orders
/// become notifications.
pub fn classify_event(event: &StripeEvent) -> Result<EventClass, EventError> {
    let result = match event.event_type.as_str() {
        CHECKOUT_COMPLETED => {
            let object = parse_object(event)?;
            if object.payment_status.as_deref() != Some("paid") {
                let status = object.payment_status.unwrap_or_else(|| "unknown".into());
                return Ok(EventClass::Ignored(format!(
                    "Checkout completed with payment status '{status}'. The asynchronous result will follow."
                )));
            }
            PaymentResult::Succeeded
        },
        ASYNC_PAYMENT_SUCCEEDED => PaymentResult::Succeeded,
        ASYNC_PAYMENT_FAILED | SESSION_EXPIRED | PAYMENT_INTENT_FAILED => PaymentResult::Failed,
        other => return Ok(EventClass::Ignored(format!("{other} events are not handled"))),
    };
    let object = parse_object(event)?;
    let order_id = object.order_id().ok_or_else(|| EventError::MissingOrderId(event.id.clone()))?;
    let occurred_at = event_time(event)?;
    let mut notification = PaymentNotification::new(&event.id, &event.event_type, result, order_id, occurred_at);
    if event.event_type == PAYMENT_INTENT_FAILED {
        notification = notification.with_payment_intent_id(&object.id);
    } else {
        notification = notification.with_session_id(&object.id);
        if let Some(intent) = object.payment_intent_id() {
            notification = notification.with_payment_intent_id(intent);
        }
    }
    let amount = object.amount_total.or(object.amount);
    if let (Some(amount), Some(currency)) = (amount, object.currency.as_ref()) {
        notification = notification.with_amount(amount, currency);
    }
    Ok(EventClass::Payment(notification))
}

fn parse_object(event: &StripeEvent) -> Result<EventObject, EventError> {
    serde_json::from_value(event.data.object.clone())
        .map_err(|e| EventError::InvalidPayload(format!("Event {} has an unexpected object. {e}", event.id)))
}

fn event_time(event: &StripeEvent) -> Result<DateTime<Utc>, EventError> {
    Utc.timestamp_opt(event.created, 0).single().ok_or_else(|| EventError::InvalidTimestamp(event.id.clone()))
}
