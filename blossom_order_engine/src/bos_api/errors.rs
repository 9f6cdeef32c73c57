use thiserror::Error;

use crate::{db_types::OrderId, pricing::PricingError, traits::StoreError};

/// The error taxonomy that callers of the engine see.
#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    /// Bad caller input. The message is safe to show to the user.
    #[error("{0}")]
    ValidationError(String),
    #[error("Order {0} does not exist")]
    NotFoundError(OrderId),
    /// A payment session is already bound to a different order.
    #[error("{0}")]
    ConflictError(String),
    /// A store could not be reached or a write failed. The order id, if known, is carried for operators.
    #[error("A storage dependency failed. {message}")]
    DependencyError { order_id: Option<OrderId>, message: String },
    /// This payment event has been seen before. The webhook flow treats this as success.
    #[error("Payment event {0} has already been processed")]
    DuplicateEventError(String),
}

impl OrderFlowError {
    pub fn dependency<S: Into<String>>(order_id: Option<&OrderId>, message: S) -> Self {
        Self::DependencyError { order_id: order_id.cloned(), message: message.into() }
    }

    /// Attaches an order id to a dependency error that does not have one yet.
    pub fn for_order(self, id: &OrderId) -> Self {
        match self {
            Self::DependencyError { order_id: None, message } => {
                Self::DependencyError { order_id: Some(id.clone()), message }
            },
            other => other,
        }
    }
}

impl From<StoreError> for OrderFlowError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OrderNotFound(id) => Self::NotFoundError(id),
            StoreError::SessionConflict { .. } => Self::ConflictError(e.to_string()),
            StoreError::ForbiddenTransition(msg) => Self::ValidationError(msg),
            e => Self::DependencyError { order_id: None, message: e.to_string() },
        }
    }
}

impl From<PricingError> for OrderFlowError {
    fn from(e: PricingError) -> Self {
        Self::ValidationError(e.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn store_errors_map_onto_the_taxonomy() {
        let id = OrderId::from("BLS-2026-ERR001");
        let missing = OrderFlowError::from(StoreError::OrderNotFound(id.clone()));
        assert!(matches!(missing, OrderFlowError::NotFoundError(_)));
        let conflict = StoreError::SessionConflict { session_id: "cs_1".into(), order_id: id.clone() };
        assert!(matches!(OrderFlowError::from(conflict), OrderFlowError::ConflictError(_)));
        let timeout = StoreError::Timeout { backend: "relational", millis: 5000 };
        let err = OrderFlowError::from(timeout).for_order(&id);
        assert!(matches!(err, OrderFlowError::DependencyError { order_id: Some(_), .. }));
        assert!(err.to_string().contains("5000ms"));
        let pricing = OrderFlowError::from(PricingError::EmptyCart);
        assert!(matches!(pricing, OrderFlowError::ValidationError(_)));
    }
}
