//! # Blossom order engine public API
//!
//! * [`order_flow_api`] creates, reads and administers orders. It prices carts through the fee calculator and talks
//!   to the stores only through the [`crate::router::StoreRouter`].
//! * [`payment_flow_api`] reconciles payment processor notifications with orders: deduplication, the cross-reference
//!   guard, the terminal `paid` check and the payment state transition.
//!
//! The other submodules are the request and response types these APIs use, and the caller-facing error taxonomy.
//!
//! ```rust,ignore
//! let router = StoreRouter::new(topology, &backends, OrderIdGenerator::default(), worker.queue());
//! let orders = OrderFlowApi::new(router.clone(), Arc::new(PriceSchedule::default()));
//! let order = orders.create_order(request).await?;
//! ```

pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
pub mod payment_flow_api;
pub mod payment_objects;
