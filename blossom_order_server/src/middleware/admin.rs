//! Shared-secret guard for the `/admin` scope.
//!
//! Every request must carry the configured admin secret in the `X-Admin-Secret` header. When no secret has been
//! configured, the admin routes are closed altogether.
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use blossom_common::Secret;
use futures::future::LocalBoxFuture;
use log::{trace, warn};

use crate::{errors::ServerError, helpers::constant_time_eq};

pub const ADMIN_SECRET_HEADER: &str = "X-Admin-Secret";

pub struct AdminSecretFactory {
    secret: Secret<String>,
}

impl AdminSecretFactory {
    pub fn new(secret: Secret<String>) -> Self {
        AdminSecretFactory { secret }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminSecretFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AdminSecretService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminSecretService { secret: self.secret.clone(), service: Rc::new(service) }))
    }
}

pub struct AdminSecretService<S> {
    secret: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminSecretService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let expected = self.secret.reveal();
        let presented = req.headers().get(ADMIN_SECRET_HEADER).map(|v| v.as_bytes());
        let authorised = match presented {
            Some(value) => !expected.is_empty() && constant_time_eq(value, expected.as_bytes()),
            None => false,
        };
        if authorised {
            trace!("🔐️ Admin request to {} authorised", req.path());
            let service = Rc::clone(&self.service);
            Box::pin(async move { service.call(req).await })
        } else {
            warn!("🔐️ Admin request to {} denied. The admin secret is missing or wrong.", req.path());
            Box::pin(async { Err(ServerError::Unauthorized.into()) })
        }
    }
}
