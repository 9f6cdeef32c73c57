//! `SqliteDatabase` is the relational order store.
//!
//! It implements [`OrderStore`] and [`PaymentEventLedger`] on top of the low-level functions in the sibling modules.
//! Every multi-statement write runs in a single transaction, so an order row, its items and its history entry are
//! either all written or not at all.
use std::{collections::HashMap, fmt::Debug, time::Duration};

use chrono::Utc;
use log::*;
use sqlx::{migrate, SqliteConnection, SqlitePool};

use super::{
    db_url,
    new_pool,
    order_items,
    orders,
    payment_events,
    projection::{patch_snapshot_payment_fields, project_order, OrderItemRow},
    status_history,
};
use crate::{
    db_types::{
        apply_fulfillment_update,
        apply_payment_update,
        fulfillment_label,
        payment_label,
        preserve_paid_state,
        FulfillmentStatus,
        NewPaymentEvent,
        Order,
        OrderId,
        PaymentEvent,
        PaymentUpdate,
        StatusHistoryEntry,
        Transition,
    },
    traits::{InsertEventResult, OrderQueryFilter, OrderStore, PaymentEventLedger, StoreError},
};

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

/// The order and, for legacy rows, the raw snapshot it was projected from.
async fn load_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<(Order, Option<String>)>, StoreError> {
    let Some(row) = orders::fetch_order_row(order_id, conn).await? else {
        return Ok(None);
    };
    let snapshot = row.snapshot.clone();
    let items = order_items::fetch_items(order_id, conn).await?;
    let order = project_order(row, items)?;
    Ok(Some((order, snapshot)))
}

/// Writes the result of a transition: the changed columns, a history entry for status changes, and the patched
/// legacy snapshot if the row has one.
async fn persist_payment_transition(
    transition: &Transition,
    snapshot: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<(), StoreError> {
    let order = match transition {
        Transition::Unchanged(_) => return Ok(()),
        Transition::FieldsUpdated(order) => order,
        Transition::StatusChanged { order, from, to } => {
            status_history::append_entry(&order.order_id, Some(from.as_str()), to, order.updated_at, conn).await?;
            order
        },
    };
    orders::update_payment_columns(order, conn).await?;
    if let Some(snapshot) = snapshot {
        let patched = patch_snapshot_payment_fields(&snapshot, order)?;
        orders::update_snapshot(&order.order_id, &patched, conn).await?;
        trace!("🗃️ Patched the legacy snapshot for order [{}]", order.order_id);
    }
    Ok(())
}

/// History entries for the statuses an upsert moved. Payment comes first, matching the order of the columns.
async fn append_upsert_history(
    existing: &Order,
    order: &Order,
    conn: &mut SqliteConnection,
) -> Result<(), StoreError> {
    if existing.payment_status != order.payment_status {
        let (from, to) = (payment_label(existing.payment_status), payment_label(order.payment_status));
        status_history::append_entry(&order.order_id, Some(&from), &to, order.updated_at, conn).await?;
    }
    if existing.fulfillment_status != order.fulfillment_status {
        let (from, to) = (fulfillment_label(existing.fulfillment_status), fulfillment_label(order.fulfillment_status));
        status_history::append_entry(&order.order_id, Some(&from), &to, order.updated_at, conn).await?;
    }
    Ok(())
}

impl OrderStore for SqliteDatabase {
    fn backend_name(&self) -> &'static str {
        "relational"
    }

    async fn create_order(&self, order: &Order) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut order = order.clone();
        let existing = load_order(&order.order_id, &mut tx).await?.map(|(existing, _)| existing);
        if let Some(existing) = &existing {
            preserve_paid_state(&mut order, existing);
        }
        let inserted = orders::upsert_order(&order, &mut tx).await?;
        order_items::replace_items(&order.order_id, &order.items, &mut tx).await?;
        if inserted {
            let initial = payment_label(order.payment_status);
            status_history::append_entry(&order.order_id, None, &initial, order.created_at, &mut tx).await?;
        } else if let Some(existing) = &existing {
            append_upsert_history(existing, &order, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ Order [{}] saved with {} items", order.order_id, order.items.len());
        Ok(inserted)
    }

    async fn get_order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = load_order(order_id, &mut conn).await?.map(|(order, _)| order);
        Ok(order)
    }

    async fn get_order_by_payment_session_id(&self, session_id: &str) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let Some(row) = orders::fetch_order_row_by_session_id(session_id, &mut conn).await? else {
            return Ok(None);
        };
        let items = order_items::fetch_items(&OrderId(row.order_id.clone()), &mut conn).await?;
        Ok(Some(project_order(row, items)?))
    }

    async fn update_payment_status(&self, order_id: &OrderId, update: &PaymentUpdate) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;
        let (current, snapshot) =
            load_order(order_id, &mut tx).await?.ok_or_else(|| StoreError::OrderNotFound(order_id.clone()))?;
        let transition = apply_payment_update(&current, update, Utc::now());
        persist_payment_transition(&transition, snapshot, &mut tx).await?;
        tx.commit().await?;
        match &transition {
            Transition::StatusChanged { from, to, .. } => info!("🗃️ Order [{order_id}] moved from {from} to {to}"),
            Transition::FieldsUpdated(_) => debug!("🗃️ Payment details for order [{order_id}] updated"),
            Transition::Unchanged(_) => debug!("🗃️ Payment update for order [{order_id}] changed nothing"),
        }
        Ok(transition.into_order())
    }

    async fn update_fulfillment_status(
        &self,
        order_id: &OrderId,
        status: FulfillmentStatus,
    ) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;
        let (current, _) =
            load_order(order_id, &mut tx).await?.ok_or_else(|| StoreError::OrderNotFound(order_id.clone()))?;
        let transition = apply_fulfillment_update(&current, status, Utc::now())?;
        if let Transition::StatusChanged { order, from, to } = &transition {
            orders::update_fulfillment_column(order_id, status, order.updated_at, &mut tx).await?;
            status_history::append_entry(order_id, Some(from.as_str()), to, order.updated_at, &mut tx).await?;
            info!("🗃️ Order [{order_id}] moved from {from} to {to}");
        }
        tx.commit().await?;
        Ok(transition.into_order())
    }

    async fn delete_order(&self, order_id: &OrderId) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let deleted = orders::delete_order(order_id, &mut conn).await?;
        if deleted {
            info!("🗃️ Order [{order_id}] deleted");
        }
        Ok(deleted)
    }

    async fn list_orders(&self, filter: &OrderQueryFilter) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let rows = orders::search_orders(filter, &mut conn).await?;
        let ids = rows.iter().map(|r| r.order_id.clone()).collect::<Vec<_>>();
        let mut items_by_order: HashMap<String, Vec<OrderItemRow>> = HashMap::new();
        for item in order_items::fetch_items_for_orders(&ids, &mut conn).await? {
            items_by_order.entry(item.order_id.clone()).or_default().push(item);
        }
        rows.into_iter()
            .map(|row| {
                let items = items_by_order.remove(&row.order_id).unwrap_or_default();
                project_order(row, items)
            })
            .collect()
    }
}

impl PaymentEventLedger for SqliteDatabase {
    async fn record_payment_event(&self, event: &NewPaymentEvent) -> Result<InsertEventResult, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = payment_events::idempotent_insert(event, &mut conn).await?;
        if result == InsertEventResult::Inserted {
            debug!("🗃️ Payment event {} ({}) recorded", event.event_id, event.event_type);
        }
        Ok(result)
    }

    async fn release_payment_event(&self, event_id: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        if payment_events::delete_event(event_id, &mut conn).await? {
            warn!("🗃️ Payment event {event_id} released from the ledger. A redelivery will be processed again.");
        }
        Ok(())
    }

    async fn fetch_payment_event(&self, event_id: &str) -> Result<Option<PaymentEvent>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payment_events::fetch_event(event_id, &mut conn).await?)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `BOS_DATABASE_URL`, or the default.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections, DEFAULT_BUSY_TIMEOUT).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        migrate!("./src/db/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Migrations failed. {e}")))?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// The audit trail for an order, oldest entry first.
    pub async fn fetch_status_history(&self, order_id: &OrderId) -> Result<Vec<StatusHistoryEntry>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(status_history::fetch_history(order_id, &mut conn).await?)
    }
}
