use crate::{
    db_types::{FulfillmentStatus, Order, OrderId, PaymentUpdate},
    object_store::ObjectStoreDatabase,
    router::BackendKind,
    traits::{OrderQueryFilter, OrderStore, StoreError},
    SqliteDatabase,
};

/// One of the two order stores. Dispatches [`OrderStore`] calls to the concrete backend.
#[derive(Debug, Clone)]
pub enum OrderBackend {
    Relational(SqliteDatabase),
    ObjectStore(ObjectStoreDatabase),
}

impl OrderBackend {
    pub fn kind(&self) -> BackendKind {
        match self {
            OrderBackend::Relational(_) => BackendKind::Relational,
            OrderBackend::ObjectStore(_) => BackendKind::ObjectStore,
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $db:ident => $call:expr) => {
        match $self {
            OrderBackend::Relational($db) => $call.await,
            OrderBackend::ObjectStore($db) => $call.await,
        }
    };
}

impl OrderStore for OrderBackend {
    fn backend_name(&self) -> &'static str {
        match self {
            OrderBackend::Relational(db) => db.backend_name(),
            OrderBackend::ObjectStore(db) => db.backend_name(),
        }
    }

    async fn create_order(&self, order: &Order) -> Result<bool, StoreError> {
        dispatch!(self, db => db.create_order(order))
    }

    async fn get_order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        dispatch!(self, db => db.get_order_by_id(order_id))
    }

    async fn get_order_by_payment_session_id(&self, session_id: &str) -> Result<Option<Order>, StoreError> {
        dispatch!(self, db => db.get_order_by_payment_session_id(session_id))
    }

    async fn update_payment_status(&self, order_id: &OrderId, update: &PaymentUpdate) -> Result<Order, StoreError> {
        dispatch!(self, db => db.update_payment_status(order_id, update))
    }

    async fn update_fulfillment_status(
        &self,
        order_id: &OrderId,
        status: FulfillmentStatus,
    ) -> Result<Order, StoreError> {
        dispatch!(self, db => db.update_fulfillment_status(order_id, status))
    }

    async fn delete_order(&self, order_id: &OrderId) -> Result<bool, StoreError> {
        dispatch!(self, db => db.delete_order(order_id))
    }

    async fn list_orders(&self, filter: &OrderQueryFilter) -> Result<Vec<Order>, StoreError> {
        dispatch!(self, db => db.list_orders(filter))
    }
}

/// Both stores, constructed once at startup and shared by the router and the side-effect worker.
#[derive(Debug, Clone)]
pub struct Backends {
    pub relational: SqliteDatabase,
    pub object_store: ObjectStoreDatabase,
}

impl Backends {
    pub fn new(relational: SqliteDatabase, object_store: ObjectStoreDatabase) -> Self {
        Self { relational, object_store }
    }

    pub fn get(&self, kind: BackendKind) -> OrderBackend {
        match kind {
            BackendKind::Relational => OrderBackend::Relational(self.relational.clone()),
            BackendKind::ObjectStore => OrderBackend::ObjectStore(self.object_store.clone()),
        }
    }
}
