pub mod object_store;
pub mod sqlite;
pub mod traits;
