use std::{fmt::Debug, path::Path, sync::Arc};

use chrono::Utc;
use log::*;
use tokio::sync::Mutex;

use super::{
    document::{self, Mutation},
    medium::{DocumentMedium, DocumentVersion, HostedDocument, HostedDocumentConfig, LocalDocument, WriteOutcome},
};
use crate::{
    db_types::{FulfillmentStatus, Order, OrderId, PaymentUpdate},
    traits::{OrderQueryFilter, OrderStore, StoreError},
};

pub const DEFAULT_ORDERS_FILE: &str = "data/orders.json";
const MAX_WRITE_ATTEMPTS: u32 = 5;

#[derive(Clone)]
pub struct ObjectStoreDatabase {
    medium: Arc<DocumentMedium>,
    write_lock: Arc<Mutex<()>>,
    max_write_attempts: u32,
}

impl Debug for ObjectStoreDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectStoreDatabase ({})", self.medium.describe())
    }
}

impl ObjectStoreDatabase {
    pub fn new(medium: DocumentMedium) -> Self {
        Self {
            medium: Arc::new(medium),
            write_lock: Arc::new(Mutex::new(())),
            max_write_attempts: MAX_WRITE_ATTEMPTS,
        }
    }

    pub fn hosted(client: reqwest::Client, config: HostedDocumentConfig) -> Self {
        Self::new(DocumentMedium::Hosted(HostedDocument::new(client, config)))
    }

    pub fn local<P: AsRef<Path>>(path: P) -> Self {
        Self::new(DocumentMedium::Local(LocalDocument::new(path)))
    }

    pub fn describe(&self) -> String {
        self.medium.describe()
    }

    async fn load(&self) -> Result<(Vec<Order>, DocumentVersion), StoreError> {
        match self.medium.read().await? {
            Some(doc) => Ok((document::decode(&doc.bytes)?, doc.version)),
            None => Ok((vec![], DocumentVersion::Absent)),
        }
    }

    /// Runs one read-modify-write cycle. `f` may be called more than once if a concurrent writer gets in first.
    async fn modify<T, F>(&self, mut f: F) -> Result<T, StoreError>
    where F: FnMut(&mut Vec<Order>) -> Result<Mutation<T>, StoreError> {
        let _guard = self.write_lock.lock().await;
        for attempt in 1..=self.max_write_attempts {
            let (mut orders, version) = self.load().await?;
            let value = match f(&mut orders)? {
                Mutation::Unchanged(value) => return Ok(value),
                Mutation::Changed(value) => value,
            };
            let bytes = document::encode(&orders)?;
            match self.medium.write(bytes, &version).await? {
                WriteOutcome::Written => {
                    trace!("🪣️ Order document written ({} orders)", orders.len());
                    return Ok(value);
                },
                WriteOutcome::VersionMismatch => {
                    warn!(
                        "🪣️ The order document changed while we were updating it. Retrying ({attempt}/{})",
                        self.max_write_attempts
                    );
                },
            }
        }
        error!("🪣️ Giving up on the order document after {} conflicting writes", self.max_write_attempts);
        Err(StoreError::WriteConflict(self.max_write_attempts))
    }
}

impl OrderStore for ObjectStoreDatabase {
    fn backend_name(&self) -> &'static str {
        "object store"
    }

    async fn create_order(&self, order: &Order) -> Result<bool, StoreError> {
        let inserted = self.modify(|orders| Ok(document::upsert(orders, order.clone()))).await?;
        debug!("🪣️ Order [{}] {}", order.order_id, if inserted { "appended" } else { "replaced" });
        Ok(inserted)
    }

    async fn get_order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        let (orders, _) = self.load().await?;
        Ok(orders.into_iter().find(|o| o.order_id == *order_id))
    }

    async fn get_order_by_payment_session_id(&self, session_id: &str) -> Result<Option<Order>, StoreError> {
        let (orders, _) = self.load().await?;
        Ok(orders.into_iter().find(|o| o.payment_session_id.as_deref() == Some(session_id)))
    }

    async fn update_payment_status(&self, order_id: &OrderId, update: &PaymentUpdate) -> Result<Order, StoreError> {
        let order = self.modify(|orders| document::update_payment(orders, order_id, update, Utc::now())).await?;
        debug!("🪣️ Order [{order_id}] payment status is {}", order.payment_status);
        Ok(order)
    }

    async fn update_fulfillment_status(
        &self,
        order_id: &OrderId,
        status: FulfillmentStatus,
    ) -> Result<Order, StoreError> {
        let order = self.modify(|orders| document::update_fulfillment(orders, order_id, status, Utc::now())).await?;
        debug!("🪣️ Order [{order_id}] fulfillment status is {}", order.fulfillment_status);
        Ok(order)
    }

    async fn delete_order(&self, order_id: &OrderId) -> Result<bool, StoreError> {
        let deleted = self.modify(|orders| Ok(document::remove(orders, order_id))).await?;
        if deleted {
            info!("🪣️ Order [{order_id}] removed from the order document");
        }
        Ok(deleted)
    }

    async fn list_orders(&self, filter: &OrderQueryFilter) -> Result<Vec<Order>, StoreError> {
        let (orders, _) = self.load().await?;
        let mut matches = orders.into_iter().filter(|o| filter.matches(o)).collect::<Vec<_>>();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            matches.truncate(limit as usize);
        }
        Ok(matches)
    }
}
