use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentFailedEvent {
    pub order: Order,
    /// The processor event that reported the failure, e.g. `checkout.session.expired`
    pub reason: String,
}

impl PaymentFailedEvent {
    pub fn new<S: Into<String>>(order: Order, reason: S) -> Self {
        Self { order, reason: reason.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    OrderCreated(OrderCreatedEvent),
    OrderPaid(OrderPaidEvent),
    PaymentFailed(PaymentFailedEvent),
}

impl OrderEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated(_) => "order_created",
            OrderEvent::OrderPaid(_) => "order_paid",
            OrderEvent::PaymentFailed(_) => "payment_failed",
        }
    }

    pub fn order(&self) -> &Order {
        match self {
            OrderEvent::OrderCreated(e) => &e.order,
            OrderEvent::OrderPaid(e) => &e.order,
            OrderEvent::PaymentFailed(e) => &e.order,
        }
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order().order_id
    }
}
