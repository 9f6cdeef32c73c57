use std::{fmt::Debug, future::Future, pin::Pin, sync::Arc};

use thiserror::Error;

use crate::events::{OrderCreatedEvent, OrderEvent, OrderPaidEvent, PaymentFailedEvent};

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl From<String> for HookError {
    fn from(s: String) -> Self {
        Self(s)
    }
}

pub type HookFuture = Pin<Box<dyn Future<Output = Result<(), HookError>> + Send>>;
pub type Handler<E> = Arc<dyn Fn(E) -> HookFuture + Send + Sync>;

/// At most one handler per event type. A failing handler is retried on its own, so it never causes another hook to
/// run twice.
#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_created: Option<Handler<OrderCreatedEvent>>,
    pub on_order_paid: Option<Handler<OrderPaidEvent>>,
    pub on_payment_failed: Option<Handler<PaymentFailedEvent>>,
}

impl Debug for EventHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHooks")
            .field("on_order_created", &self.on_order_created.is_some())
            .field("on_order_paid", &self.on_order_paid.is_some())
            .field("on_payment_failed", &self.on_payment_failed.is_some())
            .finish()
    }
}

impl EventHooks {
    pub fn on_order_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCreatedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_created = Some(Arc::new(f));
        self
    }

    pub fn on_order_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPaidEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_paid = Some(Arc::new(f));
        self
    }

    pub fn on_payment_failed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentFailedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_payment_failed = Some(Arc::new(f));
        self
    }

    /// Registers the same handler for every event type.
    pub fn on_any_event<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderEvent) -> HookFuture) + Send + Sync + 'static {
        let f = Arc::new(f);
        let g = Arc::clone(&f);
        let h = Arc::clone(&f);
        self.on_order_created(move |e| (f)(OrderEvent::OrderCreated(e)));
        self.on_order_paid(move |e| (g)(OrderEvent::OrderPaid(e)));
        self.on_payment_failed(move |e| (h)(OrderEvent::PaymentFailed(e)));
        self
    }

    /// Calls the hook registered for this event, if there is one.
    pub async fn dispatch(&self, event: OrderEvent) -> Result<(), HookError> {
        match event {
            OrderEvent::OrderCreated(e) => match &self.on_order_created {
                Some(handler) => (handler)(e).await,
                None => Ok(()),
            },
            OrderEvent::OrderPaid(e) => match &self.on_order_paid {
                Some(handler) => (handler)(e).await,
                None => Ok(()),
            },
            OrderEvent::PaymentFailed(e) => match &self.on_payment_failed {
                Some(handler) => (handler)(e).await,
                None => Ok(()),
            },
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;
    use crate::test_utils::sample_order;

    #[tokio::test]
    async fn dispatch_to_matching_hook() {
        let paid = Arc::new(AtomicU64::new(0));
        let p2 = paid.clone();
        let mut hooks = EventHooks::default();
        hooks.on_order_paid(move |_| {
            let paid = p2.clone();
            Box::pin(async move {
                paid.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        });
        let order = sample_order("BLS-2026-HOOK01");
        hooks.dispatch(OrderEvent::OrderPaid(OrderPaidEvent::new(order.clone()))).await.unwrap();
        // no hook registered for this one
        hooks.dispatch(OrderEvent::OrderCreated(OrderCreatedEvent::new(order))).await.unwrap();
        assert_eq!(paid.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn catch_all_hook() {
        let names = Arc::new(std::sync::Mutex::new(Vec::new()));
        let n2 = names.clone();
        let mut hooks = EventHooks::default();
        hooks.on_any_event(move |e| {
            let names = n2.clone();
            Box::pin(async move {
                names.lock().unwrap().push(e.name());
                Err(HookError("mail server down".into()))
            })
        });
        let order = sample_order("BLS-2026-HOOK02");
        let err = hooks.dispatch(OrderEvent::PaymentFailed(PaymentFailedEvent::new(order, "expired"))).await;
        assert!(err.is_err());
        assert_eq!(*names.lock().unwrap(), vec!["payment_failed"]);
    }
}
