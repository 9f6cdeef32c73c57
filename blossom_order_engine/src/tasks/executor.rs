use std::{future::Future, time::Duration};

use log::*;
use thiserror::Error;
use tokio::time::timeout;

use crate::{
    events::{EventHooks, HookError},
    router::{Backends, DEFAULT_BACKEND_TIMEOUT},
    tasks::SideEffect,
    traits::{OrderStore, StoreError},
};

#[derive(Debug, Clone, Error)]
pub enum SideEffectError {
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("Notification hook failed. {0}")]
    Hook(#[from] HookError),
}

/// Runs a single side-effect task once. Retrying is the worker's job.
pub trait SideEffectExecutor: Send + Sync + 'static {
    fn execute(&self, effect: &SideEffect) -> impl Future<Output = Result<(), SideEffectError>> + Send;
}

/// The production executor: writes to the order stores and calls the notification hooks.
#[derive(Debug, Clone)]
pub struct BackendExecutor {
    backends: Backends,
    hooks: EventHooks,
    backend_timeout: Duration,
}

impl BackendExecutor {
    pub fn new(backends: Backends, hooks: EventHooks) -> Self {
        Self { backends, hooks, backend_timeout: DEFAULT_BACKEND_TIMEOUT }
    }

    pub fn with_backend_timeout(mut self, backend_timeout: Duration) -> Self {
        self.backend_timeout = backend_timeout;
        self
    }

    async fn bounded<T, F>(&self, backend: &'static str, call: F) -> Result<T, StoreError>
    where F: Future<Output = Result<T, StoreError>> {
        let millis = self.backend_timeout.as_millis() as u64;
        timeout(self.backend_timeout, call).await.map_err(|_| StoreError::Timeout { backend, millis })?
    }
}

impl SideEffectExecutor for BackendExecutor {
    async fn execute(&self, effect: &SideEffect) -> Result<(), SideEffectError> {
        match effect {
            SideEffect::MirrorOrder { target, order } | SideEffect::Backfill { target, order } => {
                let store = self.backends.get(*target);
                self.bounded(store.backend_name(), store.create_order(order)).await?;
                trace!("📬️ Order [{}] copied to the {target} store", order.order_id);
            },
            SideEffect::MirrorDelete { target, order_id } => {
                let store = self.backends.get(*target);
                let deleted = self.bounded(store.backend_name(), store.delete_order(order_id)).await?;
                trace!("📬️ Order [{order_id}] removed from the {target} store: {deleted}");
            },
            SideEffect::Notify(event) => {
                self.hooks.dispatch(event.clone()).await?;
                trace!("📬️ {} notification sent for [{}]", event.name(), event.order_id());
            },
        }
        Ok(())
    }
}
