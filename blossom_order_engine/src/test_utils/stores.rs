use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tempfile::TempDir;

use super::{prepare_test_env, random_db_path, temp_orders_file};
use crate::{
    events::{EventHooks, OrderEvent},
    helpers::OrderIdGenerator,
    object_store::ObjectStoreDatabase,
    router::{Backends, StoreRouter, StoreTopology},
    tasks::{BackendExecutor, RetryPolicy, SideEffectQueue, SideEffectWorker, DEFAULT_QUEUE_BUFFER},
};

/// Both stores on throwaway storage, with a side-effect worker running in the background.
pub struct TestStores {
    pub backends: Backends,
    pub queue: SideEffectQueue,
    _orders_dir: TempDir,
}

impl TestStores {
    pub async fn start(hooks: EventHooks) -> Self {
        let relational = prepare_test_env(&random_db_path()).await;
        let (orders_dir, path) = temp_orders_file();
        let backends = Backends::new(relational, ObjectStoreDatabase::local(path));
        let executor = BackendExecutor::new(backends.clone(), hooks);
        let policy = RetryPolicy::default().with_initial_delay(Duration::from_millis(10));
        let worker = SideEffectWorker::new(DEFAULT_QUEUE_BUFFER, executor, policy);
        let queue = worker.queue();
        tokio::spawn(worker.start());
        Self { backends, queue, _orders_dir: orders_dir }
    }

    pub fn router(&self, topology: StoreTopology) -> StoreRouter {
        StoreRouter::new(topology, &self.backends, OrderIdGenerator::default(), self.queue.clone())
    }

    /// Blocks until the background mirrors, backfills and notifications have all run.
    pub async fn settle(&self) {
        let idle = self.queue.wait_until_idle(Duration::from_secs(10)).await;
        assert!(idle, "Side effects did not finish in time");
    }
}

/// Hooks that record every event they receive, in order.
pub fn recording_hooks() -> (EventHooks, Arc<Mutex<Vec<OrderEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let mut hooks = EventHooks::default();
    hooks.on_any_event(move |event| {
        let sink = Arc::clone(&sink);
        Box::pin(async move {
            sink.lock().map_err(|e| format!("poisoned: {e}"))?.push(event);
            Ok(())
        })
    });
    (hooks, events)
}
