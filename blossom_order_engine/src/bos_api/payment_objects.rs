use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderId, PaymentStatus, PaymentUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentResult {
    Succeeded,
    /// Failed or expired. Not terminal: a later success still moves the order to `paid`.
    Failed,
}

/// A payment processor notification after authentication and classification. Only events the engine acts on are
/// turned into one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentNotification {
    /// The processor's unique event id. This is the deduplication key.
    pub event_id: String,
    pub event_type: String,
    pub result: PaymentResult,
    pub order_id: OrderId,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub payment_intent_id: Option<String>,
    /// Minor units, as reported
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl PaymentNotification {
    pub fn succeeded<S: Into<String>>(event_id: S, order_id: OrderId, occurred_at: DateTime<Utc>) -> Self {
        Self::new(event_id, "checkout.session.completed", PaymentResult::Succeeded, order_id, occurred_at)
    }

    pub fn failed<S: Into<String>>(event_id: S, order_id: OrderId, occurred_at: DateTime<Utc>) -> Self {
        Self::new(event_id, "checkout.session.async_payment_failed", PaymentResult::Failed, order_id, occurred_at)
    }

    pub fn new<S: Into<String>, T: Into<String>>(
        event_id: S,
        event_type: T,
        result: PaymentResult,
        order_id: OrderId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            result,
            order_id,
            session_id: None,
            payment_intent_id: None,
            amount: None,
            currency: None,
            occurred_at,
        }
    }

    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_payment_intent_id<S: Into<String>>(mut self, intent: S) -> Self {
        self.payment_intent_id = Some(intent.into());
        self
    }

    pub fn with_amount<S: Into<String>>(mut self, amount: i64, currency: S) -> Self {
        self.amount = Some(amount);
        self.currency = Some(currency.into());
        self
    }

    /// The update exactly as the event reports it. Nothing is recomputed.
    pub fn payment_update(&self) -> PaymentUpdate {
        let status = match self.result {
            PaymentResult::Succeeded => PaymentStatus::Paid,
            PaymentResult::Failed => PaymentStatus::PaymentFailed,
        };
        let mut update = PaymentUpdate::new(status);
        update.session_id = self.session_id.clone();
        update.payment_intent_id = self.payment_intent_id.clone();
        if self.result == PaymentResult::Succeeded {
            update.amount = self.amount;
            update.currency = self.currency.clone();
            update.paid_at = Some(self.occurred_at);
        }
        update
    }
}

/// What the webhook flow did with a notification. Every variant is acknowledged to the processor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "order", rename_all = "snake_case")]
pub enum WebhookOutcome {
    Applied(Order),
    /// The event id is already in the ledger.
    Duplicate,
    /// No store knows the order. Acknowledged so the processor stops retrying.
    OrderNotFound,
    AlreadyPaid(Order),
    /// Not an event type the engine acts on.
    Ignored,
}

impl WebhookOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            WebhookOutcome::Applied(_) => "applied",
            WebhookOutcome::Duplicate => "duplicate",
            WebhookOutcome::OrderNotFound => "order_not_found",
            WebhookOutcome::AlreadyPaid(_) => "already_paid",
            WebhookOutcome::Ignored => "ignored",
        }
    }
}
