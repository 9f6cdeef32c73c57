use std::path::PathBuf;

use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use tempfile::TempDir;

use crate::SqliteDatabase;

/// Creates a fresh, migrated database at `url` and returns a handle to it.
pub async fn prepare_test_env(url: &str) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    db.run_migrations().await.expect("Error running DB migrations");
    db
}

pub fn random_db_path() -> String {
    let path = std::env::temp_dir().join(format!("bos_test_store_{}.db", rand::random::<u64>()));
    format!("sqlite://{}", path.display())
}

/// A path for an order document inside a new temporary directory. The directory is removed when the returned
/// `TempDir` is dropped.
pub fn temp_orders_file() -> (TempDir, PathBuf) {
    let dir = tempfile::Builder::new().prefix("bos_orders_").tempdir().expect("Error creating temp dir");
    let path = dir.path().join("orders.json");
    (dir, path)
}

pub async fn create_database(url: &str) {
    if let Err(e) = Sqlite::drop_database(url).await {
        trace!("Could not drop database {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("Created Sqlite database {url}");
}
