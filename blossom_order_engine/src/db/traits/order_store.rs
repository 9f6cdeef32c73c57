use thiserror::Error;

use crate::{
    db_types::{FulfillmentStatus, Order, OrderId, PaymentUpdate},
    traits::OrderQueryFilter,
};

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Object store error: {0}")]
    ObjectStoreError(String),
    #[error("Could not (de)serialize order data. {0}")]
    SerializationError(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Payment session {session_id} is already bound to order {order_id}")]
    SessionConflict { session_id: String, order_id: OrderId },
    #[error("The {backend} backend did not respond within {millis}ms")]
    Timeout { backend: &'static str, millis: u64 },
    #[error("The requested status change is not allowed. {0}")]
    ForbiddenTransition(String),
    #[error("The order document kept changing underneath us. Gave up after {0} attempts")]
    WriteConflict(u32),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::SerializationError(e.to_string())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::ObjectStoreError(e.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::ObjectStoreError(e.to_string())
    }
}

impl From<crate::db_types::ForbiddenTransition> for StoreError {
    fn from(e: crate::db_types::ForbiddenTransition) -> Self {
        StoreError::ForbiddenTransition(e.to_string())
    }
}

/// The behaviour every order storage backend exposes.
#[allow(async_fn_in_trait)]
pub trait OrderStore: Clone {
    /// A short, stable name for log messages and timeout errors.
    fn backend_name(&self) -> &'static str;

    /// Writes the order, replacing any existing record with the same id. Returns `true` if the order was new.
    async fn create_order(&self, order: &Order) -> Result<bool, StoreError>;

    async fn get_order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError>;

    async fn get_order_by_payment_session_id(&self, session_id: &str) -> Result<Option<Order>, StoreError>;

    /// Applies a payment update following the payment state machine (see
    /// [`crate::db_types::apply_payment_update`]). Re-applying the current state succeeds without changing anything.
    /// Fails with [`StoreError::OrderNotFound`] if the order does not exist.
    async fn update_payment_status(&self, order_id: &OrderId, update: &PaymentUpdate) -> Result<Order, StoreError>;

    async fn update_fulfillment_status(
        &self,
        order_id: &OrderId,
        status: FulfillmentStatus,
    ) -> Result<Order, StoreError>;

    /// Returns `true` if an order was removed.
    async fn delete_order(&self, order_id: &OrderId) -> Result<bool, StoreError>;

    /// Orders matching the filter, newest first.
    async fn list_orders(&self, filter: &OrderQueryFilter) -> Result<Vec<Order>, StoreError>;
}
