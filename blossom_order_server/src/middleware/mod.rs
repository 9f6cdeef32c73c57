mod admin;
mod signature;

pub use admin::{AdminSecretFactory, AdminSecretService, ADMIN_SECRET_HEADER};
pub use signature::{SignatureMiddlewareFactory, SignatureMiddlewareService, SIGNATURE_HEADER};
