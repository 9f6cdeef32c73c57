//! # SQLite backend
//!
//! This module contains the "low-level" SQLite database interactions.
//!
//! All these interactions are simple functions (rather than stateful structs) that accept a `&mut SqliteConnection`
//! argument. Callers obtain a connection from the pool, or open a transaction when several writes must land together,
//! and call through to the functions without any other changes. [`SqliteDatabase`] composes them into the
//! [`crate::traits::OrderStore`] and [`crate::traits::PaymentEventLedger`] contracts.
use std::{str::FromStr, time::Duration};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod order_items;
pub mod orders;
pub mod payment_events;
pub mod projection;
mod sqlite_impl;
pub mod status_history;

pub use sqlite_impl::SqliteDatabase;

pub const SQLITE_DB_URL: &str = "sqlite://data/blossom_orders.db";

/// Reads `BOS_DATABASE_URL`, returning `None` if it is not set.
pub fn configured_db_url() -> Option<String> {
    std::env::var("BOS_DATABASE_URL").ok().filter(|s| !s.trim().is_empty())
}

pub fn db_url() -> String {
    let result = configured_db_url().unwrap_or_else(|| {
        info!("🗃️ BOS_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

/// Opens a connection pool. The database file is created if it does not exist yet. Connections wait up to
/// `busy_timeout` for a competing writer before failing.
pub async fn new_pool(url: &str, max_connections: u32, busy_timeout: Duration) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(busy_timeout);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(busy_timeout)
        .connect_with(options)
        .await?;
    Ok(pool)
}
