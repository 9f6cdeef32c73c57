//! # Blossom order server
//! This crate hosts the HTTP server for the Blossom storefront. It is responsible for:
//! Accepting order submissions, and opening hosted checkout sessions for orders that are paid online.
//! Receiving signed payment notifications from the payment processor and applying them to orders.
//! Serving the public order page and the admin order endpoints.
//!
//! Order storage, pricing and payment reconciliation live in `blossom_order_engine`; this crate only translates
//! between HTTP and the engine APIs.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/orders`: Submit an order that will be paid offline.
//! * `/api/checkout`: Submit an order and open a checkout session for it.
//! * `/api/orders/{order_id}`: The public view of an order.
//! * `/webhooks/payments`: Payment processor deliveries. Requests must carry a valid `Stripe-Signature` header.
//! * `/admin/orders/...`: Order administration. Requests must carry the `X-Admin-Secret` header.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
