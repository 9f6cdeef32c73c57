//! The store router presents one order store to the rest of the engine while the authoritative backend is chosen by
//! configuration.
//!
//! * Reads go to the primary first. On a miss the secondary is consulted (if fallback reads are enabled) and a hit is
//!   backfilled into the primary in the background.
//! * Writes go to the primary synchronously and are mirrored to the secondary in the background (if dual writes are
//!   enabled).
//! * Payment and fulfillment updates only ever target the primary.
mod backend;
mod store_router;
mod topology;

pub use backend::{Backends, OrderBackend};
pub use store_router::{StoreRouter, MAX_ID_ATTEMPTS};
pub use topology::{BackendKind, StoreTopology, UnknownBackend, DEFAULT_BACKEND_TIMEOUT};
