//! Background side effects.
//!
//! Request handlers never wait on the secondary store or on notifications. Instead they enqueue a [`SideEffect`] on
//! the [`SideEffectQueue`] and return. A [`SideEffectWorker`] executes each task in the background, retrying with
//! exponential backoff, and logs at `error` level (with the order id) when a task is finally abandoned.
mod executor;
mod queue;
mod retry;
mod side_effect;

pub use executor::{BackendExecutor, SideEffectError, SideEffectExecutor};
pub use queue::{QueueStats, SideEffectQueue, SideEffectWorker, DEFAULT_QUEUE_BUFFER};
pub use retry::RetryPolicy;
pub use side_effect::SideEffect;
