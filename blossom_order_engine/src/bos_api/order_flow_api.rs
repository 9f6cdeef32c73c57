use std::{fmt::Debug, sync::Arc};

use blossom_common::Baht;
use log::*;

use crate::{
    bos_api::{errors::OrderFlowError, order_objects::OrderRequest},
    db_types::{FulfillmentStatus, NewOrder, Order, OrderId, PaymentMethod, PaymentStatus, PaymentUpdate},
    events::{OrderCreatedEvent, OrderEvent, OrderPaidEvent},
    pricing::{compute_totals, PriceSchedule},
    router::StoreRouter,
    tasks::SideEffect,
    traits::OrderQueryFilter,
};

/// `OrderFlowApi` handles order creation from the storefront and the admin operations on orders.
#[derive(Clone)]
pub struct OrderFlowApi {
    router: StoreRouter,
    schedule: Arc<PriceSchedule>,
}

impl Debug for OrderFlowApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({})", self.router.topology())
    }
}

impl OrderFlowApi {
    pub fn new(router: StoreRouter, schedule: Arc<PriceSchedule>) -> Self {
        Self { router, schedule }
    }

    pub fn router(&self) -> &StoreRouter {
        &self.router
    }

    pub fn schedule(&self) -> &PriceSchedule {
        &self.schedule
    }

    fn notify(&self, event: OrderEvent) {
        self.router.side_effects().enqueue(SideEffect::Notify(event));
    }

    /// Validates and prices the request. Nothing is written.
    pub fn quote(&self, request: &OrderRequest, payment_method: PaymentMethod) -> Result<NewOrder, OrderFlowError> {
        request.validate()?;
        let outcome = compute_totals(&self.schedule, &request.items, &request.delivery_input(), Baht::zero())?;
        Ok(NewOrder {
            customer: request.customer_contact(),
            items: outcome.items,
            delivery: request.delivery_details(outcome.district),
            totals: outcome.totals,
            currency: self.schedule.currency.clone(),
            payment_method,
            locale: request.locale.clone(),
        })
    }

    /// Places an order that will be paid offline (bank transfer or cash on delivery). The order-created notification
    /// goes out straight away.
    pub async fn create_order(&self, request: OrderRequest) -> Result<Order, OrderFlowError> {
        let new_order = self.quote(&request, PaymentMethod::Offline)?;
        let order = self.router.create(new_order).await?;
        debug!("🛒️ Order [{}] placed for {} {}", order.order_id, order.totals.grand_total, order.currency);
        self.notify(OrderEvent::OrderCreated(OrderCreatedEvent::new(order.clone())));
        Ok(order)
    }

    /// Places an order that is about to go through the hosted checkout. No notification is sent until the payment
    /// result arrives.
    pub async fn create_pending_order(&self, request: OrderRequest) -> Result<Order, OrderFlowError> {
        let new_order = self.quote(&request, PaymentMethod::Online)?;
        let order = self.router.create_pending(new_order).await?;
        debug!("🛒️ Pending order [{}] placed for {} {}", order.order_id, order.totals.grand_total, order.currency);
        Ok(order)
    }

    /// Binds the checkout session to the order so that webhook events can be cross-checked against it.
    pub async fn attach_checkout_session(&self, order_id: &OrderId, session_id: &str) -> Result<Order, OrderFlowError> {
        let update = PaymentUpdate::new(PaymentStatus::PendingPayment).with_session_id(session_id);
        let order = self
            .router
            .update_payment_status(order_id, &update)
            .await
            .map_err(|e| OrderFlowError::from(e).for_order(order_id))?;
        match order.payment_session_id.as_deref() {
            Some(bound) if bound == session_id => Ok(order),
            Some(bound) => Err(OrderFlowError::ConflictError(format!(
                "Order {order_id} is already bound to payment session {bound}"
            ))),
            // a paid or otherwise frozen order ignores the update
            None => Err(OrderFlowError::ConflictError(format!("Order {order_id} cannot take a payment session"))),
        }
    }

    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Order, OrderFlowError> {
        self.router
            .get_by_id(order_id)
            .await
            .map_err(|e| OrderFlowError::from(e).for_order(order_id))?
            .ok_or_else(|| OrderFlowError::NotFoundError(order_id.clone()))
    }

    pub async fn search_orders(&self, filter: &OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        Ok(self.router.list(filter).await?)
    }

    pub async fn update_fulfillment(
        &self,
        order_id: &OrderId,
        status: FulfillmentStatus,
    ) -> Result<Order, OrderFlowError> {
        self.ensure_in_primary(order_id).await?;
        let order = self
            .router
            .update_fulfillment_status(order_id, status)
            .await
            .map_err(|e| OrderFlowError::from(e).for_order(order_id))?;
        info!("🛒️ Order [{order_id}] fulfillment is now {}", order.fulfillment_status);
        Ok(order)
    }

    /// Records an offline payment confirmed by an admin. Marking a paid order again changes nothing.
    pub async fn mark_paid_manually(&self, order_id: &OrderId) -> Result<Order, OrderFlowError> {
        let current = self.ensure_in_primary(order_id).await?;
        if current.is_paid() {
            return Ok(current);
        }
        let order = self
            .router
            .update_payment_status(order_id, &PaymentUpdate::new(PaymentStatus::Paid))
            .await
            .map_err(|e| OrderFlowError::from(e).for_order(order_id))?;
        if order.is_paid() {
            info!("🛒️ Order [{order_id}] marked as paid by an admin");
            self.notify(OrderEvent::OrderPaid(OrderPaidEvent::new(order.clone())));
        }
        Ok(order)
    }

    pub async fn delete_order(&self, order_id: &OrderId) -> Result<(), OrderFlowError> {
        let deleted = self.router.delete(order_id).await.map_err(|e| OrderFlowError::from(e).for_order(order_id))?;
        if deleted {
            info!("🛒️ Order [{order_id}] deleted");
            Ok(())
        } else {
            Err(OrderFlowError::NotFoundError(order_id.clone()))
        }
    }

    /// Mutations only target the primary store, so an order that so far only lives in the secondary is copied over
    /// first.
    async fn ensure_in_primary(&self, order_id: &OrderId) -> Result<Order, OrderFlowError> {
        self.router
            .get_by_id_for_update(order_id)
            .await
            .map_err(|e| OrderFlowError::from(e).for_order(order_id))?
            .ok_or_else(|| OrderFlowError::NotFoundError(order_id.clone()))
    }
}
