use std::fmt::Display;

use crate::{
    db_types::{Order, OrderId},
    events::OrderEvent,
    router::BackendKind,
};

#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    /// Copy the order to the secondary store after a primary write.
    MirrorOrder { target: BackendKind, order: Order },
    /// Copy an order that was only found in the secondary store into the primary.
    Backfill { target: BackendKind, order: Order },
    /// Remove the order from the secondary store after a primary delete.
    MirrorDelete { target: BackendKind, order_id: OrderId },
    /// Hand the event to the notification hooks.
    Notify(OrderEvent),
}

impl SideEffect {
    pub fn order_id(&self) -> &OrderId {
        match self {
            SideEffect::MirrorOrder { order, .. } => &order.order_id,
            SideEffect::Backfill { order, .. } => &order.order_id,
            SideEffect::MirrorDelete { order_id, .. } => order_id,
            SideEffect::Notify(event) => event.order_id(),
        }
    }
}

impl Display for SideEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SideEffect::MirrorOrder { target, order } => write!(f, "mirror of [{}] to {target}", order.order_id),
            SideEffect::Backfill { target, order } => write!(f, "backfill of [{}] into {target}", order.order_id),
            SideEffect::MirrorDelete { target, order_id } => write!(f, "delete of [{order_id}] from {target}"),
            SideEffect::Notify(event) => write!(f, "{} notification for [{}]", event.name(), event.order_id()),
        }
    }
}
