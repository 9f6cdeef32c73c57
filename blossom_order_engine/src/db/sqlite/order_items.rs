use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use super::projection::OrderItemRow;
use crate::{
    db_types::{OrderId, OrderItem},
    traits::StoreError,
};

/// Replaces every item row of the order: all existing rows are deleted and `items` inserted in order. Items are
/// never diffed.
pub async fn replace_items(
    order_id: &OrderId,
    items: &[OrderItem],
    conn: &mut SqliteConnection,
) -> Result<(), StoreError> {
    let deleted =
        sqlx::query("DELETE FROM order_items WHERE order_id = $1").bind(order_id.as_str()).execute(&mut *conn).await?;
    trace!("🗃️ Removed {} item rows for order [{order_id}]", deleted.rows_affected());
    if items.is_empty() {
        return Ok(());
    }
    let rows = items
        .iter()
        .enumerate()
        .map(|(i, item)| Ok((i as i64, item, serde_json::to_string(&item.add_ons)?)))
        .collect::<Result<Vec<_>, StoreError>>()?;
    let mut builder = QueryBuilder::new(
        "INSERT INTO order_items (order_id, position, bouquet_id, title, size, unit_price, add_ons, image_url) ",
    );
    builder.push_values(rows, |mut b, (position, item, add_ons)| {
        b.push_bind(order_id.as_str())
            .push_bind(position)
            .push_bind(item.bouquet_id.clone())
            .push_bind(item.title.clone())
            .push_bind(item.size.clone())
            .push_bind(item.unit_price.value())
            .push_bind(add_ons)
            .push_bind(item.image_url.clone());
    });
    builder.build().execute(conn).await?;
    trace!("🗃️ Inserted {} item rows for order [{order_id}]", items.len());
    Ok(())
}

pub async fn fetch_items(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItemRow>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY position ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Fetches the item rows for a batch of orders in one query.
pub async fn fetch_items_for_orders(
    order_ids: &[String],
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderItemRow>, sqlx::Error> {
    if order_ids.is_empty() {
        return Ok(vec![]);
    }
    let mut builder = QueryBuilder::new("SELECT * FROM order_items WHERE order_id IN (");
    let mut ids = builder.separated(", ");
    for id in order_ids {
        ids.push_bind(id.clone());
    }
    ids.push_unseparated(") ORDER BY order_id, position");
    let items = builder.build_query_as::<OrderItemRow>().fetch_all(conn).await?;
    Ok(items)
}
