//! Pure operations on the decoded order document, a JSON array of [`Order`]s.
use chrono::{DateTime, Utc};

use crate::{
    db_types::{
        apply_fulfillment_update,
        apply_payment_update,
        preserve_paid_state,
        FulfillmentStatus,
        Order,
        OrderId,
        PaymentUpdate,
        Transition,
    },
    traits::StoreError,
};

/// The result of a read-modify-write step. Only `Changed` results are written back.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation<T> {
    Unchanged(T),
    Changed(T),
}

pub fn decode(bytes: &[u8]) -> Result<Vec<Order>, StoreError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(vec![]);
    }
    Ok(serde_json::from_slice(bytes)?)
}

pub fn encode(orders: &[Order]) -> Result<Vec<u8>, StoreError> {
    Ok(serde_json::to_vec_pretty(orders)?)
}

fn position(orders: &[Order], order_id: &OrderId) -> Option<usize> {
    orders.iter().position(|o| o.order_id == *order_id)
}

/// Appends the order, or replaces the existing entry with the same id. The result is `true` for a new order.
pub fn upsert(orders: &mut Vec<Order>, mut order: Order) -> Mutation<bool> {
    match position(orders, &order.order_id) {
        Some(i) => {
            preserve_paid_state(&mut order, &orders[i]);
            order.created_at = orders[i].created_at;
            if orders[i] == order {
                Mutation::Unchanged(false)
            } else {
                orders[i] = order;
                Mutation::Changed(false)
            }
        },
        None => {
            orders.push(order);
            Mutation::Changed(true)
        },
    }
}

fn replace_with(orders: &mut [Order], i: usize, transition: Transition) -> Mutation<Order> {
    if transition.is_change() {
        let order = transition.into_order();
        orders[i] = order.clone();
        Mutation::Changed(order)
    } else {
        Mutation::Unchanged(transition.into_order())
    }
}

pub fn update_payment(
    orders: &mut [Order],
    order_id: &OrderId,
    update: &PaymentUpdate,
    now: DateTime<Utc>,
) -> Result<Mutation<Order>, StoreError> {
    let i = position(orders, order_id).ok_or_else(|| StoreError::OrderNotFound(order_id.clone()))?;
    if let Some(session_id) = &update.session_id {
        let bound_elsewhere = orders
            .iter()
            .find(|o| o.order_id != *order_id && o.payment_session_id.as_deref() == Some(session_id.as_str()));
        if let Some(other) = bound_elsewhere {
            if orders[i].payment_session_id.is_none() && !orders[i].is_paid() {
                return Err(StoreError::SessionConflict {
                    session_id: session_id.clone(),
                    order_id: other.order_id.clone(),
                });
            }
        }
    }
    let transition = apply_payment_update(&orders[i], update, now);
    Ok(replace_with(orders, i, transition))
}

pub fn update_fulfillment(
    orders: &mut [Order],
    order_id: &OrderId,
    status: FulfillmentStatus,
    now: DateTime<Utc>,
) -> Result<Mutation<Order>, StoreError> {
    let i = position(orders, order_id).ok_or_else(|| StoreError::OrderNotFound(order_id.clone()))?;
    let transition = apply_fulfillment_update(&orders[i], status, now)?;
    Ok(replace_with(orders, i, transition))
}

pub fn remove(orders: &mut Vec<Order>, order_id: &OrderId) -> Mutation<bool> {
    let before = orders.len();
    orders.retain(|o| o.order_id != *order_id);
    if orders.len() < before {
        Mutation::Changed(true)
    } else {
        Mutation::Unchanged(false)
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;
    use crate::{db_types::PaymentStatus, test_utils::sample_order};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn empty_documents_decode_to_no_orders() {
        assert!(decode(b"").unwrap().is_empty());
        assert!(decode(b"  \n").unwrap().is_empty());
        assert!(decode(b"[]").unwrap().is_empty());
        assert!(matches!(decode(b"{not json"), Err(StoreError::SerializationError(_))));
    }

    #[test]
    fn upsert_appends_then_replaces() {
        let mut orders = vec![];
        let order = sample_order("BLS-2026-DOC001");
        assert_eq!(upsert(&mut orders, order.clone()), Mutation::Changed(true));
        assert_eq!(upsert(&mut orders, order.clone()), Mutation::Unchanged(false));
        let mut edited = order.clone();
        edited.customer.name = "Someone else".into();
        assert_eq!(upsert(&mut orders, edited), Mutation::Changed(false));
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].customer.name, "Someone else");
    }

    #[test]
    fn payment_updates() {
        let mut orders = vec![sample_order("BLS-2026-DOC001"), sample_order("BLS-2026-DOC002")];
        let id = OrderId::from("BLS-2026-DOC002");
        let update = PaymentUpdate::new(PaymentStatus::Paid).with_session_id("cs_a");
        let Mutation::Changed(order) = update_payment(&mut orders, &id, &update, now()).unwrap() else {
            panic!("expected a change");
        };
        assert!(order.is_paid());
        assert!(orders[1].is_paid());
        assert!(!orders[0].is_paid());
        // replay is a no-op
        assert!(matches!(update_payment(&mut orders, &id, &update, now()).unwrap(), Mutation::Unchanged(_)));
        // the session is already bound to DOC002
        let first = OrderId::from("BLS-2026-DOC001");
        let steal = PaymentUpdate::new(PaymentStatus::Paid).with_session_id("cs_a");
        assert!(matches!(update_payment(&mut orders, &first, &steal, now()), Err(StoreError::SessionConflict { .. })));
        let missing = OrderId::from("BLS-2026-NOPE00");
        assert!(matches!(update_payment(&mut orders, &missing, &update, now()), Err(StoreError::OrderNotFound(_))));
    }

    #[test]
    fn fulfillment_and_removal() {
        let mut orders = vec![sample_order("BLS-2026-DOC001")];
        let id = OrderId::from("BLS-2026-DOC001");
        let changed = update_fulfillment(&mut orders, &id, FulfillmentStatus::Cancelled, now()).unwrap();
        assert!(matches!(changed, Mutation::Changed(_)));
        let err = update_fulfillment(&mut orders, &id, FulfillmentStatus::Preparing, now());
        assert!(matches!(err, Err(StoreError::ForbiddenTransition(_))));
        assert_eq!(remove(&mut orders, &id), Mutation::Changed(true));
        assert_eq!(remove(&mut orders, &id), Mutation::Unchanged(false));
    }
}
