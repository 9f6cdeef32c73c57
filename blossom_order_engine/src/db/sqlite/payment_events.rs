use chrono::Utc;
use log::debug;
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db_types::{NewPaymentEvent, OrderId, PaymentEvent},
    traits::InsertEventResult,
};

#[derive(Debug, Clone, FromRow)]
struct PaymentEventRow {
    event_id: String,
    event_type: String,
    order_id: Option<String>,
    received_at: chrono::DateTime<Utc>,
}

/// Inserts the event into the ledger. A unique violation on the event id is not an error: it means the event was
/// already recorded, and is reported as [`InsertEventResult::AlreadyProcessed`].
pub async fn idempotent_insert(
    event: &NewPaymentEvent,
    conn: &mut SqliteConnection,
) -> Result<InsertEventResult, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO payment_events (event_id, event_type, order_id, received_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(&event.event_id)
    .bind(&event.event_type)
    .bind(event.order_id.as_ref().map(|o| o.as_str()))
    .bind(Utc::now())
    .execute(conn)
    .await;
    match result {
        Ok(_) => Ok(InsertEventResult::Inserted),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            debug!("🗃️ Payment event {} is already in the ledger", event.event_id);
            Ok(InsertEventResult::AlreadyProcessed)
        },
        Err(e) => Err(e),
    }
}

pub async fn delete_event(event_id: &str, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM payment_events WHERE event_id = $1").bind(event_id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn fetch_event(event_id: &str, conn: &mut SqliteConnection) -> Result<Option<PaymentEvent>, sqlx::Error> {
    let row: Option<PaymentEventRow> = sqlx::query_as("SELECT * FROM payment_events WHERE event_id = $1")
        .bind(event_id)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(|r| PaymentEvent {
        event_id: r.event_id,
        event_type: r.event_type,
        order_id: r.order_id.map(OrderId),
        received_at: r.received_at,
    }))
}
