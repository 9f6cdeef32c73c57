use std::{
    sync::{
        atomic::{AtomicI64, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use log::*;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::tasks::{RetryPolicy, SideEffect, SideEffectExecutor};

pub const DEFAULT_QUEUE_BUFFER: usize = 1024;

#[derive(Debug, Default)]
pub struct QueueStats {
    completed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl QueueStats {
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Tasks abandoned after the final retry.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    /// Tasks that never made it onto the queue because it was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::SeqCst)
    }
}

/// The producer side of the side-effect queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SideEffectQueue {
    sender: mpsc::Sender<SideEffect>,
    in_flight: Arc<AtomicI64>,
    stats: Arc<QueueStats>,
}

impl SideEffectQueue {
    /// Hands the task to the worker. This never blocks. If the queue is full the task is dropped and logged, since
    /// the caller's request must not wait on a side effect.
    pub fn enqueue(&self, effect: SideEffect) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        match self.sender.try_send(effect) {
            Ok(()) => {},
            Err(TrySendError::Full(effect)) => {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                self.stats.dropped.fetch_add(1, Ordering::SeqCst);
                error!("📬️ Side-effect queue is full. Dropped the {effect} for order [{}]", effect.order_id());
            },
            Err(TrySendError::Closed(effect)) => {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                self.stats.dropped.fetch_add(1, Ordering::SeqCst);
                error!("📬️ Side-effect worker has stopped. Dropped the {effect} for order [{}]", effect.order_id());
            },
        }
    }

    /// Tasks that have been enqueued but not yet completed or abandoned.
    pub fn in_flight(&self) -> i64 {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }

    /// Waits until every enqueued task has finished. Returns `false` if that did not happen within `timeout`.
    pub async fn wait_until_idle(&self, timeout: Duration) -> bool {
        let start = tokio::time::Instant::now();
        while self.in_flight() > 0 {
            if start.elapsed() >= timeout {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        true
    }
}

/// The consumer side. Each task runs in its own tokio task, so a slow notification never holds up a mirror write.
pub struct SideEffectWorker<X: SideEffectExecutor> {
    listener: mpsc::Receiver<SideEffect>,
    queue: SideEffectQueue,
    executor: Arc<X>,
    policy: RetryPolicy,
}

impl<X: SideEffectExecutor> SideEffectWorker<X> {
    pub fn new(buffer_size: usize, executor: X, policy: RetryPolicy) -> Self {
        let (sender, listener) = mpsc::channel(buffer_size.max(1));
        let queue = SideEffectQueue { sender, in_flight: Arc::new(AtomicI64::new(0)), stats: Arc::default() };
        Self { listener, queue, executor: Arc::new(executor), policy }
    }

    pub fn queue(&self) -> SideEffectQueue {
        self.queue.clone()
    }

    /// Runs until every [`SideEffectQueue`] handle has been dropped and the remaining tasks have finished.
    pub async fn start(mut self) {
        debug!("📬️ Starting side-effect worker");
        let SideEffectQueue { sender, in_flight, stats } = self.queue;
        // only the producers keep the channel open
        drop(sender);
        while let Some(effect) = self.listener.recv().await {
            trace!("📬️ Running {effect}");
            let executor = Arc::clone(&self.executor);
            let in_flight = Arc::clone(&in_flight);
            let stats = Arc::clone(&stats);
            let policy = self.policy;
            tokio::spawn(async move {
                run_with_retry(executor.as_ref(), &effect, &policy, &stats).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            });
        }
        while in_flight.load(Ordering::SeqCst) > 0 {
            debug!("📬️ Waiting for {} side effects to complete", in_flight.load(Ordering::SeqCst));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        debug!("📬️ Side-effect worker has shut down");
    }
}

async fn run_with_retry<X: SideEffectExecutor>(
    executor: &X,
    effect: &SideEffect,
    policy: &RetryPolicy,
    stats: &QueueStats,
) {
    let mut attempt = 1;
    loop {
        match executor.execute(effect).await {
            Ok(()) => {
                stats.completed.fetch_add(1, Ordering::SeqCst);
                trace!("📬️ {effect} done after {attempt} attempt(s)");
                return;
            },
            Err(e) if policy.should_retry(attempt) => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    "📬️ {effect} failed (attempt {attempt}/{}). Retrying in {}ms. {e}",
                    policy.max_attempts,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            },
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::SeqCst);
                error!(
                    "📬️ Giving up on the {effect} after {attempt} attempts. Order [{}] may be out of sync. {e}",
                    effect.order_id()
                );
                return;
            },
        }
    }
}
