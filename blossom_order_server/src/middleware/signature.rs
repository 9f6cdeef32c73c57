//! Payment webhook signature middleware for Actix Web.
//!
//! The payment processor signs every delivery with the shared webhook secret and sends the result in the
//! `Stripe-Signature` header as `t=<unix seconds>,v1=<hex hmac>`. The signed data is `"{t}.{raw body}"`, so the body
//! has to be read here, byte for byte, before any JSON parsing happens. It is put back on the request afterwards so
//! that the handler can read it again.
//!
//! Deliveries without a valid signature are rejected with `400 Signature invalid` and never reach the handler.
use std::{
    future::{ready, Ready},
    rc::Rc,
    time::Duration,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
};
use blossom_common::Secret;
use chrono::Utc;
use futures::future::LocalBoxFuture;
use log::{error, trace, warn};

use crate::{
    errors::ServerError,
    helpers::{verify_signature, SignatureError},
};

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

pub struct SignatureMiddlewareFactory {
    secret: Secret<String>,
    tolerance: Duration,
}

impl SignatureMiddlewareFactory {
    pub fn new(secret: Secret<String>, tolerance: Duration) -> Self {
        SignatureMiddlewareFactory { secret, tolerance }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SignatureMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = SignatureMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SignatureMiddlewareService {
            secret: self.secret.clone(),
            tolerance: self.tolerance,
            service: Rc::new(service),
        }))
    }
}

pub struct SignatureMiddlewareService<S> {
    secret: Secret<String>,
    tolerance: Duration,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SignatureMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.secret.reveal().clone();
        let tolerance = self.tolerance;
        Box::pin(async move {
            trace!("🔐️ Checking the webhook signature for request");
            let header = req.headers().get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()).map(String::from);
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract request data: {e:?}");
                ServerError::InvalidSignature
            })?;
            let result = match header {
                Some(header) => verify_signature(&secret, &header, data.as_ref(), Utc::now().timestamp(), tolerance),
                None => Err(SignatureError::MissingHeader),
            };
            match result {
                Ok(()) => {
                    trace!("🔐️ Webhook signature check ✅️");
                    req.set_payload(bytes_to_payload(data));
                    service.call(req).await
                },
                Err(SignatureError::NotConfigured) => {
                    error!("🔐️ A webhook arrived, but BOS_WEBHOOK_SECRET is not set. Rejecting it.");
                    Err(ServerError::InvalidSignature.into())
                },
                Err(e) => {
                    warn!("🔐️ Rejecting webhook delivery. {e}");
                    Err(ServerError::InvalidSignature.into())
                },
            }
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
