use chrono::{DateTime, Utc};
use log::trace;
use sqlx::{FromRow, SqliteConnection};

use crate::db_types::{OrderId, StatusHistoryEntry};

#[derive(Debug, Clone, FromRow)]
struct HistoryRow {
    order_id: String,
    from_status: Option<String>,
    to_status: String,
    changed_at: DateTime<Utc>,
}

impl From<HistoryRow> for StatusHistoryEntry {
    fn from(row: HistoryRow) -> Self {
        Self {
            order_id: OrderId(row.order_id),
            from_status: row.from_status,
            to_status: row.to_status,
            changed_at: row.changed_at,
        }
    }
}

/// Appends an entry to the audit trail. Entries are never updated or deleted; the table's triggers enforce this.
pub async fn append_entry(
    order_id: &OrderId,
    from_status: Option<&str>,
    to_status: &str,
    changed_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO order_status_history (order_id, from_status, to_status, changed_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(order_id.as_str())
    .bind(from_status)
    .bind(to_status)
    .bind(changed_at)
    .execute(conn)
    .await?;
    trace!("🗃️ History for [{order_id}]: {} -> {to_status}", from_status.unwrap_or("∅"));
    Ok(())
}

pub async fn fetch_history(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<StatusHistoryEntry>, sqlx::Error> {
    let rows: Vec<HistoryRow> = sqlx::query_as("SELECT * FROM order_status_history WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(rows.into_iter().map(StatusHistoryEntry::from).collect())
}
