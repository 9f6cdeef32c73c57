use std::fmt::Debug;

use log::*;

use crate::{
    bos_api::{
        errors::OrderFlowError,
        payment_objects::{PaymentNotification, PaymentResult, WebhookOutcome},
    },
    db_types::{NewPaymentEvent, Order, PaymentStatus},
    events::{OrderEvent, OrderPaidEvent, PaymentFailedEvent},
    router::StoreRouter,
    tasks::SideEffect,
    traits::{InsertEventResult, PaymentEventLedger},
};

/// `PaymentFlowApi` reconciles payment processor notifications with orders.
///
/// Signature checks and event classification happen before a notification reaches this API. From here on, each
/// step is a hard gate:
///
/// 1. The event id is inserted into the ledger. A duplicate stops processing and is acknowledged.
/// 2. For successful payments, a session id that is already bound to a *different* order is a conflict.
/// 3. A missing order is acknowledged (the processor would otherwise retry forever). A `paid` order is never touched
///    again.
/// 4. The transition is applied on the primary store, with the amount, currency, payment intent and time exactly as
///    the event reports them.
/// 5. Notifications are queued. They never affect the response.
///
/// If step 2 or step 4 fails, the ledger entry is released so that the processor's retry is not swallowed as a
/// duplicate.
#[derive(Clone)]
pub struct PaymentFlowApi<L> {
    router: StoreRouter,
    ledger: L,
}

impl<L> Debug for PaymentFlowApi<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi")
    }
}

impl<L> PaymentFlowApi<L> {
    pub fn new(router: StoreRouter, ledger: L) -> Self {
        Self { router, ledger }
    }
}

impl<L> PaymentFlowApi<L>
where L: PaymentEventLedger
{
    pub async fn process_notification(
        &self,
        notification: &PaymentNotification,
    ) -> Result<WebhookOutcome, OrderFlowError> {
        let order_id = &notification.order_id;
        match self.record_event(notification).await {
            Ok(()) => {},
            Err(OrderFlowError::DuplicateEventError(event_id)) => {
                info!("🪝️ Event {event_id} for order [{order_id}] was already processed. Acknowledging.");
                return Ok(WebhookOutcome::Duplicate);
            },
            Err(e) => return Err(e.for_order(order_id)),
        }
        match self.apply(notification).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if let Err(release_err) = self.ledger.release_payment_event(&notification.event_id).await {
                    error!(
                        "🪝️ Could not release ledger entry {} for order [{order_id}]. A redelivery will be treated as \
                         a duplicate. {release_err}",
                        notification.event_id
                    );
                }
                Err(e.for_order(order_id))
            },
        }
    }

    async fn record_event(&self, notification: &PaymentNotification) -> Result<(), OrderFlowError> {
        let event = NewPaymentEvent::new(
            notification.event_id.as_str(),
            notification.event_type.as_str(),
            Some(notification.order_id.clone()),
        );
        match self.ledger.record_payment_event(&event).await? {
            InsertEventResult::Inserted => Ok(()),
            InsertEventResult::AlreadyProcessed => Err(OrderFlowError::DuplicateEventError(event.event_id)),
        }
    }

    async fn apply(&self, notification: &PaymentNotification) -> Result<WebhookOutcome, OrderFlowError> {
        let order_id = &notification.order_id;
        if notification.result == PaymentResult::Succeeded {
            self.check_session_binding(notification).await?;
        }
        let Some(order) = self.router.get_by_id_for_update(order_id).await? else {
            warn!(
                "🪝️ Event {} refers to order [{order_id}], which does not exist in any store. Acknowledging anyway.",
                notification.event_id
            );
            return Ok(WebhookOutcome::OrderNotFound);
        };
        if order.is_paid() {
            info!("🪝️ Order [{order_id}] is already paid. Ignoring {}", notification.event_type);
            return Ok(WebhookOutcome::AlreadyPaid(order));
        }
        let updated = self.router.update_payment_status(order_id, &notification.payment_update()).await?;
        if updated.payment_status != order.payment_status {
            info!("🪝️ Order [{order_id}] is now {} after {}", updated.payment_status, notification.event_type);
            self.notify(&updated, notification);
        } else {
            debug!("🪝️ {} did not change the status of order [{order_id}]", notification.event_type);
        }
        Ok(WebhookOutcome::Applied(updated))
    }

    async fn check_session_binding(&self, notification: &PaymentNotification) -> Result<(), OrderFlowError> {
        let Some(session_id) = notification.session_id.as_deref() else {
            return Ok(());
        };
        match self.router.get_by_payment_session_id(session_id).await? {
            Some(bound) if bound.order_id != notification.order_id => {
                warn!(
                    "🪝️ Event {} names order [{}], but session {session_id} belongs to order [{}]",
                    notification.event_id, notification.order_id, bound.order_id
                );
                Err(OrderFlowError::ConflictError(format!("Payment session {session_id} belongs to a different order")))
            },
            _ => Ok(()),
        }
    }

    fn notify(&self, order: &Order, notification: &PaymentNotification) {
        let event = match order.payment_status {
            PaymentStatus::Paid => OrderEvent::OrderPaid(OrderPaidEvent::new(order.clone())),
            PaymentStatus::PaymentFailed => {
                OrderEvent::PaymentFailed(PaymentFailedEvent::new(order.clone(), notification.event_type.as_str()))
            },
            PaymentStatus::PendingPayment => return,
        };
        self.router.side_effects().enqueue(SideEffect::Notify(event));
    }
}
