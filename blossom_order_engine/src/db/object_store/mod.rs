//! # Object store backend
//!
//! The whole order collection is kept as one JSON array under a fixed key. The array is read, modified and written
//! back in full for every change.
//!
//! Within a process, read-modify-write cycles are serialised by an async mutex. Across processes, the hosted medium
//! makes every write conditional on the `ETag` that was read and restarts the cycle on `412 Precondition Failed`, so
//! two writers can no longer silently overwrite each other's orders. The local file medium has no such protection
//! and must only be used by a single process.
mod document;
mod medium;
mod object_store_impl;

pub use document::Mutation;
pub use medium::{DocumentMedium, DocumentVersion, HostedDocument, HostedDocumentConfig, LocalDocument, WriteOutcome};
pub use object_store_impl::{ObjectStoreDatabase, DEFAULT_ORDERS_FILE};
