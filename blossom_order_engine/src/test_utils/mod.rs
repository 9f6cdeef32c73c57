//! Helpers for tests in this crate and in downstream crates (behind the `test_utils` feature).
mod prepare_env;
mod samples;
mod stores;

pub use prepare_env::{create_database, prepare_test_env, random_db_path, temp_orders_file};
pub use samples::{sample_new_order, sample_order, sample_request};
pub use stores::{recording_hooks, TestStores};
