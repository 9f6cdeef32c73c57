//! Blossom Order Engine
//!
//! The order persistence and payment reconciliation core of the Blossom flower storefront. It is transport-agnostic:
//! the HTTP surface lives in `blossom_order_server`.
//!
//! The library is divided into these sections:
//! 1. The data model ([`mod@db_types`]) and the fee calculator ([`mod@pricing`]). Both are pure.
//! 2. Two order stores behind the [`traits::OrderStore`] contract: the relational store ([`SqliteDatabase`]) and the
//!    single-document object store ([`object_store::ObjectStoreDatabase`]).
//! 3. The [`router::StoreRouter`], which decides which store is authoritative, falls back to the other one on a miss
//!    and keeps the two in step.
//! 4. Background side effects ([`mod@tasks`]): mirroring, backfills and notifications run on a worker with retry and
//!    backoff, so callers never wait on them.
//! 5. The public API ([`OrderFlowApi`] and [`PaymentFlowApi`]), which is what the server calls.
//!
//! Notification hooks ([`events::EventHooks`]) let the embedding application react to `OrderCreated`, `OrderPaid`
//! and `PaymentFailed` events.
mod bos_api;
mod db;

pub mod db_types;
pub mod events;
pub mod helpers;
pub mod pricing;
pub mod router;
pub mod tasks;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use bos_api::{
    errors::OrderFlowError,
    order_flow_api::OrderFlowApi,
    order_objects,
    payment_flow_api::PaymentFlowApi,
    payment_objects,
};
pub use db::{object_store, sqlite, sqlite::SqliteDatabase, traits};
