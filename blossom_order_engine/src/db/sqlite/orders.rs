use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use super::projection::OrderRow;
use crate::{
    db_types::{join_channels, FulfillmentStatus, Order, OrderId},
    traits::{OrderQueryFilter, StoreError},
};

/// Writes the order row, replacing every column of an existing row except `created_at`. Returns `true` if the
/// order did not exist before.
///
/// This is not atomic on its own. Embed it in a transaction together with the item and history writes.
pub async fn upsert_order(order: &Order, conn: &mut SqliteConnection) -> Result<bool, StoreError> {
    let exists = order_exists(&order.order_id, conn).await?;
    let geo_lat = order.delivery.geo_pin.map(|p| p.lat);
    let geo_lng = order.delivery.geo_pin.map(|p| p.lng);
    let recipient_name = order.delivery.recipient.as_ref().map(|r| r.name.clone());
    let recipient_phone = order.delivery.recipient.as_ref().and_then(|r| r.phone.clone());
    sqlx::query(
        r#"
        INSERT INTO orders (
            order_id, customer_name, customer_phone, customer_email, contact_channels,
            delivery_address, geo_lat, geo_lng, map_link, district, is_central, delivery_window,
            recipient_name, recipient_phone,
            items_total, delivery_fee, discount, grand_total, currency,
            payment_method, payment_status, fulfillment_status,
            payment_session_id, payment_intent_id, paid_amount, paid_currency, locale,
            created_at, paid_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                  $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30)
        ON CONFLICT (order_id) DO UPDATE SET
            customer_name = excluded.customer_name,
            customer_phone = excluded.customer_phone,
            customer_email = excluded.customer_email,
            contact_channels = excluded.contact_channels,
            delivery_address = excluded.delivery_address,
            geo_lat = excluded.geo_lat,
            geo_lng = excluded.geo_lng,
            map_link = excluded.map_link,
            district = excluded.district,
            is_central = excluded.is_central,
            delivery_window = excluded.delivery_window,
            recipient_name = excluded.recipient_name,
            recipient_phone = excluded.recipient_phone,
            items_total = excluded.items_total,
            delivery_fee = excluded.delivery_fee,
            discount = excluded.discount,
            grand_total = excluded.grand_total,
            currency = excluded.currency,
            payment_method = excluded.payment_method,
            payment_status = excluded.payment_status,
            fulfillment_status = excluded.fulfillment_status,
            payment_session_id = excluded.payment_session_id,
            payment_intent_id = excluded.payment_intent_id,
            paid_amount = excluded.paid_amount,
            paid_currency = excluded.paid_currency,
            locale = excluded.locale,
            paid_at = excluded.paid_at,
            updated_at = excluded.updated_at,
            snapshot = NULL;
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(&order.customer.name)
    .bind(&order.customer.phone)
    .bind(&order.customer.email)
    .bind(join_channels(&order.customer.contact_channels))
    .bind(&order.delivery.address)
    .bind(geo_lat)
    .bind(geo_lng)
    .bind(&order.delivery.map_link)
    .bind(order.delivery.district.as_str())
    .bind(order.delivery.is_central)
    .bind(&order.delivery.delivery_window)
    .bind(recipient_name)
    .bind(recipient_phone)
    .bind(order.totals.items_total.value())
    .bind(order.totals.delivery_fee.value())
    .bind(order.totals.discount.value())
    .bind(order.totals.grand_total.value())
    .bind(&order.currency)
    .bind(order.payment_method.as_str())
    .bind(order.payment_status.as_str())
    .bind(order.fulfillment_status.as_str())
    .bind(&order.payment_session_id)
    .bind(&order.payment_intent_id)
    .bind(order.paid_amount)
    .bind(&order.paid_currency)
    .bind(&order.locale)
    .bind(order.created_at)
    .bind(order.paid_at)
    .bind(order.updated_at)
    .execute(conn)
    .await?;
    debug!("🗃️ Order [{}] {}", order.order_id, if exists { "replaced" } else { "inserted" });
    Ok(!exists)
}

pub async fn order_exists(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_one(conn)
        .await?;
    Ok(count > 0)
}

pub async fn fetch_order_row(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<OrderRow>, sqlx::Error> {
    let row = sqlx::query_as("SELECT * FROM orders WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub async fn fetch_order_row_by_session_id(
    session_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderRow>, sqlx::Error> {
    let row = sqlx::query_as("SELECT * FROM orders WHERE payment_session_id = $1")
        .bind(session_id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

/// Persists the payment fields of `order`.
pub async fn update_payment_columns(order: &Order, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE orders SET
            payment_status = $1,
            payment_session_id = $2,
            payment_intent_id = $3,
            paid_amount = $4,
            paid_currency = $5,
            paid_at = $6,
            updated_at = $7
        WHERE order_id = $8
        "#,
    )
    .bind(order.payment_status.as_str())
    .bind(&order.payment_session_id)
    .bind(&order.payment_intent_id)
    .bind(order.paid_amount)
    .bind(&order.paid_currency)
    .bind(order.paid_at)
    .bind(order.updated_at)
    .bind(order.order_id.as_str())
    .execute(conn)
    .await
    .map_err(|e| session_conflict_or(e, order))?;
    if result.rows_affected() == 0 {
        return Err(StoreError::OrderNotFound(order.order_id.clone()));
    }
    trace!("🗃️ Payment columns for order [{}] set to {}", order.order_id, order.payment_status);
    Ok(())
}

fn session_conflict_or(e: sqlx::Error, order: &Order) -> StoreError {
    let is_unique_violation = e.as_database_error().map(|d| d.is_unique_violation()).unwrap_or(false);
    match (is_unique_violation, &order.payment_session_id) {
        (true, Some(session_id)) => StoreError::SessionConflict {
            session_id: session_id.clone(),
            order_id: order.order_id.clone(),
        },
        _ => StoreError::from(e),
    }
}

pub async fn update_fulfillment_column(
    order_id: &OrderId,
    status: FulfillmentStatus,
    updated_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), StoreError> {
    let result = sqlx::query("UPDATE orders SET fulfillment_status = $1, updated_at = $2 WHERE order_id = $3")
        .bind(status.as_str())
        .bind(updated_at)
        .bind(order_id.as_str())
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::OrderNotFound(order_id.clone()));
    }
    Ok(())
}

pub async fn update_snapshot(
    order_id: &OrderId,
    snapshot: &str,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET snapshot = $1 WHERE order_id = $2")
        .bind(snapshot)
        .bind(order_id.as_str())
        .execute(conn)
        .await?;
    Ok(())
}

/// Deletes the order row. Item rows go with it through the foreign key cascade. Returns `true` if a row was removed.
pub async fn delete_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM orders WHERE order_id = $1").bind(order_id.as_str()).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

/// Fetches order rows according to criteria specified in the `OrderQueryFilter`
///
/// Resulting rows are ordered by `created_at` in descending order
pub async fn search_orders(
    query: &OrderQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderRow>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(status) = query.payment_status {
        where_clause.push("payment_status = ");
        where_clause.push_bind_unseparated(status.as_str());
    }
    if let Some(status) = query.fulfillment_status {
        where_clause.push("fulfillment_status = ");
        where_clause.push_bind_unseparated(status.as_str());
    }
    if let Some(district) = query.district {
        where_clause.push("district = ");
        where_clause.push_bind_unseparated(district.as_str());
    }
    if let Some(phone) = &query.phone {
        where_clause.push("customer_phone = ");
        where_clause.push_bind_unseparated(phone.clone());
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at DESC");
    if let Some(limit) = query.limit {
        builder.push(" LIMIT ");
        builder.push_bind(i64::from(limit));
    }
    trace!("🗃️ Executing query: {}", builder.sql());
    let query = builder.build_query_as::<OrderRow>();
    let rows = query.fetch_all(conn).await?;
    trace!("🗃️ Result of search_orders: {:?}", rows.len());
    Ok(rows)
}
