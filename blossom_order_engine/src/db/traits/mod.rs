//! # Storage backend contracts
//!
//! Both order stores (the relational database and the object-store document) implement [`OrderStore`], so the
//! store router can treat them interchangeably. Each backend owns its own serialization format, but both produce and
//! consume the same logical [`crate::db_types::Order`].
//!
//! * [`OrderStore`] covers order creation (upsert), lookups, payment and fulfillment transitions, deletion and
//!   listing.
//! * [`PaymentEventLedger`] is the deduplication ledger for payment webhooks. Its unique constraint on the event id is
//!   the only point of mutual exclusion between concurrent deliveries.
mod data_objects;
mod order_store;
mod payment_ledger;

pub use data_objects::{InsertEventResult, OrderQueryFilter};
pub use order_store::{OrderStore, StoreError};
pub use payment_ledger::PaymentEventLedger;
