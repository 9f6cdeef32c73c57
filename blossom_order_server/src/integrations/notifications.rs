//! Order notifications.
//!
//! The email service is an external collaborator: it receives the event JSON (`{"event": "order_paid", "order":
//! {...}}`) and decides what to send. Handlers run on the side-effect worker, so a slow or failing email service only
//! ever delays the notification itself. A non-2xx reply is an error and the worker retries it.
use std::time::Duration;

use blossom_order_engine::events::{EventHooks, HookError, HookFuture, OrderEvent};
use log::*;
use reqwest::Client;

const NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(10);

/// POSTs each event to `url`.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    client: Client,
    url: String,
}

impl NotificationDispatcher {
    pub fn new(client: Client, url: &str) -> Self {
        Self { client, url: url.to_string() }
    }

    pub async fn send(&self, event: OrderEvent) -> Result<(), HookError> {
        let name = event.name();
        let order_id = event.order_id().clone();
        let response = self
            .client
            .post(&self.url)
            .timeout(NOTIFICATION_TIMEOUT)
            .json(&event)
            .send()
            .await
            .map_err(|e| HookError(format!("Could not deliver {name} for order [{order_id}]. {e}")))?;
        let status = response.status();
        if status.is_success() {
            info!("📧️ {name} notification for order [{order_id}] delivered");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(HookError(format!("The email service refused {name} for order [{order_id}] ({status}). {body}")))
        }
    }
}

/// Assigns the notification handlers. Without a notification URL the events are only logged.
pub fn create_notification_hooks(client: Client, url: Option<&str>) -> EventHooks {
    let mut hooks = EventHooks::default();
    match url {
        Some(url) => {
            let dispatcher = NotificationDispatcher::new(client, url);
            hooks.on_any_event(move |event| {
                let dispatcher = dispatcher.clone();
                Box::pin(async move { dispatcher.send(event).await })
            });
        },
        None => {
            hooks.on_any_event(log_event);
        },
    }
    hooks
}

fn log_event(event: OrderEvent) -> HookFuture {
    let order = event.order();
    match &event {
        OrderEvent::PaymentFailed(e) => info!(
            "📧️ payment_failed for order [{}] ({}). No notification service is configured.",
            order.order_id, e.reason
        ),
        _ => info!(
            "📧️ {} for order [{}], total {}. No notification service is configured.",
            event.name(),
            order.order_id,
            order.totals.grand_total
        ),
    }
    Box::pin(async { Ok(()) })
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use actix_web::{web, App, HttpResponse, HttpServer};
    use blossom_order_engine::{
        events::{OrderPaidEvent, PaymentFailedEvent},
        test_utils::sample_order,
    };
    use serde_json::Value;

    use super::*;

    type Inbox = Arc<Mutex<Vec<Value>>>;

    async fn receive(inbox: web::Data<Inbox>, body: web::Json<Value>) -> HttpResponse {
        let mut inbox = inbox.lock().unwrap();
        inbox.push(body.into_inner());
        if inbox.len() == 1 {
            HttpResponse::ServiceUnavailable().finish()
        } else {
            HttpResponse::Accepted().finish()
        }
    }

    #[actix_web::test]
    async fn events_are_posted_as_json() {
        let _ = env_logger::try_init();
        let inbox = Inbox::default();
        let data = web::Data::new(inbox.clone());
        let server =
            HttpServer::new(move || App::new().app_data(data.clone()).route("/notify", web::post().to(receive)))
                .workers(1)
                .bind(("127.0.0.1", 0))
                .unwrap();
        let addr = server.addrs()[0];
        let handle = server.run();
        let server_handle = handle.handle();
        actix_web::rt::spawn(handle);

        let hooks = create_notification_hooks(Client::new(), Some(&format!("http://{addr}/notify")));
        let order = sample_order("BLS-2026-MAIL01");
        let event = OrderEvent::OrderPaid(OrderPaidEvent::new(order.clone()));
        // The first delivery is refused, and the error goes back to the worker for a retry
        let err = hooks.dispatch(event.clone()).await.unwrap_err();
        assert!(err.0.contains("503"));
        hooks.dispatch(event).await.unwrap();
        let received = inbox.lock().unwrap().clone();
        assert_eq!(received.len(), 2);
        assert_eq!(received[1]["event"], "order_paid");
        assert_eq!(received[1]["order"]["orderId"], "BLS-2026-MAIL01");
        server_handle.stop(false).await;
    }

    #[tokio::test]
    async fn without_a_url_events_are_logged() {
        let hooks = create_notification_hooks(Client::new(), None);
        let order = sample_order("BLS-2026-MAIL02");
        let event = OrderEvent::PaymentFailed(PaymentFailedEvent::new(order, "checkout.session.expired"));
        assert!(hooks.dispatch(event).await.is_ok());
    }
}
