use std::{
    collections::HashSet,
    future::Future,
    sync::{Arc, Mutex},
};

use chrono::Utc;
use log::*;

use crate::{
    db_types::{FulfillmentStatus, NewOrder, Order, OrderId, PaymentMethod, PaymentUpdate},
    helpers::OrderIdGenerator,
    router::{Backends, OrderBackend, StoreTopology},
    tasks::{SideEffect, SideEffectQueue},
    traits::{OrderQueryFilter, OrderStore, StoreError},
};

/// How many fresh ids `create` tries before giving up on a collision streak.
pub const MAX_ID_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct StoreRouter {
    topology: StoreTopology,
    primary: OrderBackend,
    secondary: OrderBackend,
    id_generator: OrderIdGenerator,
    side_effects: SideEffectQueue,
    /// Orders deleted while this process has been running. A copy that is still in the secondary store (or that a
    /// mirror still in flight puts back there) must not be read back or backfilled.
    deleted: Arc<Mutex<HashSet<OrderId>>>,
}

impl StoreRouter {
    pub fn new(
        topology: StoreTopology,
        backends: &Backends,
        id_generator: OrderIdGenerator,
        side_effects: SideEffectQueue,
    ) -> Self {
        let primary = backends.get(topology.primary);
        let secondary = backends.get(topology.secondary());
        info!("🔀️ Order store topology: {topology}");
        Self { topology, primary, secondary, id_generator, side_effects, deleted: Arc::default() }
    }

    pub fn topology(&self) -> &StoreTopology {
        &self.topology
    }

    pub fn side_effects(&self) -> &SideEffectQueue {
        &self.side_effects
    }

    /// Runs a backend call with the configured timeout. A call that takes too long is reported as
    /// [`StoreError::Timeout`].
    async fn bounded<T, F>(&self, store: &OrderBackend, call: F) -> Result<T, StoreError>
    where F: Future<Output = Result<T, StoreError>> {
        let limit = self.topology.backend_timeout;
        tokio::time::timeout(limit, call).await.map_err(|_| {
            warn!("🔀️ The {} store timed out after {}ms", store.backend_name(), limit.as_millis());
            StoreError::Timeout { backend: store.backend_name(), millis: limit.as_millis() as u64 }
        })?
    }

    fn mirror(&self, order: &Order) {
        if self.topology.dual_write {
            let effect = SideEffect::MirrorOrder { target: self.secondary.kind(), order: order.clone() };
            self.side_effects.enqueue(effect);
        }
    }

    fn is_deleted(&self, order_id: &OrderId) -> bool {
        self.deleted.lock().map(|deleted| deleted.contains(order_id)).unwrap_or(false)
    }

    fn set_deleted(&self, order_id: &OrderId, is_deleted: bool) {
        match self.deleted.lock() {
            Ok(mut deleted) if is_deleted => {
                deleted.insert(order_id.clone());
            },
            Ok(mut deleted) => {
                deleted.remove(order_id);
            },
            Err(e) => error!("🔀️ The deleted-order list is unusable. {e}"),
        }
    }

    async fn unused_order_id(&self) -> Result<OrderId, StoreError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = self.id_generator.generate(Utc::now());
            let existing = self.bounded(&self.primary, self.primary.get_order_by_id(&candidate)).await?;
            if existing.is_none() {
                return Ok(candidate);
            }
            warn!("🔀️ Generated order id {candidate} is already taken. Trying another.");
        }
        Err(StoreError::DatabaseError(format!("Could not find a free order id in {MAX_ID_ATTEMPTS} attempts")))
    }

    /// Assigns an id, writes the order to the primary store and returns it. The returned order is exactly what was
    /// written; the background mirror never changes it.
    pub async fn create(&self, order: NewOrder) -> Result<Order, StoreError> {
        let order_id = self.unused_order_id().await?;
        let order = Order::from_new(order_id, order, Utc::now());
        self.bounded(&self.primary, self.primary.create_order(&order)).await?;
        self.set_deleted(&order.order_id, false);
        info!("🔀️ Order [{}] created in the {} store", order.order_id, self.primary.backend_name());
        self.mirror(&order);
        Ok(order)
    }

    /// Like [`Self::create`], for orders that will be paid through the hosted checkout.
    pub async fn create_pending(&self, mut order: NewOrder) -> Result<Order, StoreError> {
        order.payment_method = PaymentMethod::Online;
        self.create(order).await
    }

    /// Looks in the secondary store after a primary miss. A secondary failure is logged and treated as a miss,
    /// because the primary has already answered authoritatively.
    async fn fallback<F, Fut>(&self, description: &str, lookup: F) -> Option<Order>
    where
        F: FnOnce(OrderBackend) -> Fut,
        Fut: Future<Output = Result<Option<Order>, StoreError>>,
    {
        if !self.topology.fallback_reads {
            return None;
        }
        match self.bounded(&self.secondary, lookup(self.secondary.clone())).await {
            Ok(Some(order)) if self.is_deleted(&order.order_id) => {
                debug!("🔀️ {description} is still in the {} store, but it was deleted", self.secondary.backend_name());
                None
            },
            Ok(Some(order)) => {
                info!("🔀️ {description} was only found in the {} store", self.secondary.backend_name());
                Some(order)
            },
            Ok(None) => None,
            Err(e) => {
                warn!("🔀️ Fallback read for {description} failed. Treating it as not found. {e}");
                None
            },
        }
    }

    fn backfill(&self, order: &Order) {
        let effect = SideEffect::Backfill { target: self.primary.kind(), order: order.clone() };
        self.side_effects.enqueue(effect);
    }

    pub async fn get_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        if let Some(order) = self.bounded(&self.primary, self.primary.get_order_by_id(order_id)).await? {
            return Ok(Some(order));
        }
        let description = format!("Order [{order_id}]");
        let found = self.fallback(&description, |store| async move { store.get_order_by_id(order_id).await }).await;
        if let Some(order) = &found {
            self.backfill(order);
        }
        Ok(found)
    }

    /// Fetches an order that is about to be mutated. A fallback hit is copied into the primary before returning, so
    /// the mutation that follows targets the authoritative store.
    pub async fn get_by_id_for_update(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        if let Some(order) = self.bounded(&self.primary, self.primary.get_order_by_id(order_id)).await? {
            return Ok(Some(order));
        }
        let description = format!("Order [{order_id}]");
        let found = self.fallback(&description, |store| async move { store.get_order_by_id(order_id).await }).await;
        if let Some(order) = &found {
            self.bounded(&self.primary, self.primary.create_order(order)).await?;
            info!("🔀️ Order [{order_id}] copied into the {} store ahead of an update", self.primary.backend_name());
        }
        Ok(found)
    }

    pub async fn get_by_payment_session_id(&self, session_id: &str) -> Result<Option<Order>, StoreError> {
        let primary = self.primary.get_order_by_payment_session_id(session_id);
        if let Some(order) = self.bounded(&self.primary, primary).await? {
            return Ok(Some(order));
        }
        let description = format!("Payment session {session_id}");
        let found = self
            .fallback(&description, |store| async move { store.get_order_by_payment_session_id(session_id).await })
            .await;
        if let Some(order) = &found {
            self.backfill(order);
        }
        Ok(found)
    }

    /// Applies a payment update on the primary store only and mirrors the result.
    pub async fn update_payment_status(&self, order_id: &OrderId, update: &PaymentUpdate) -> Result<Order, StoreError> {
        let order = self.bounded(&self.primary, self.primary.update_payment_status(order_id, update)).await?;
        self.mirror(&order);
        Ok(order)
    }

    pub async fn update_fulfillment_status(
        &self,
        order_id: &OrderId,
        status: FulfillmentStatus,
    ) -> Result<Order, StoreError> {
        let order = self.bounded(&self.primary, self.primary.update_fulfillment_status(order_id, status)).await?;
        self.mirror(&order);
        Ok(order)
    }

    /// Deletes the order from the primary store and, when the secondary is in use, from the secondary too. The
    /// secondary delete is best-effort: a failure is retried in the background and the order stays hidden from
    /// fallback reads either way.
    pub async fn delete(&self, order_id: &OrderId) -> Result<bool, StoreError> {
        let deleted = self.bounded(&self.primary, self.primary.delete_order(order_id)).await?;
        if !self.topology.uses_secondary() {
            return Ok(deleted);
        }
        self.set_deleted(order_id, true);
        let mirror_delete = || SideEffect::MirrorDelete { target: self.secondary.kind(), order_id: order_id.clone() };
        let secondary_deleted = match self.bounded(&self.secondary, self.secondary.delete_order(order_id)).await {
            Ok(found) => found,
            Err(e) => {
                warn!("🔀️ Could not delete order [{order_id}] from the {} store. {e}", self.secondary.backend_name());
                self.side_effects.enqueue(mirror_delete());
                false
            },
        };
        if self.topology.dual_write {
            // catches a mirror of this order that was still queued
            self.side_effects.enqueue(mirror_delete());
        }
        Ok(deleted || secondary_deleted)
    }

    /// Lists orders from the primary store only.
    pub async fn list(&self, filter: &OrderQueryFilter) -> Result<Vec<Order>, StoreError> {
        self.bounded(&self.primary, self.primary.list_orders(filter)).await
    }
}
