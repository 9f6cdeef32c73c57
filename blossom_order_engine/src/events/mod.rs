//! Order lifecycle events and the hooks that react to them.
//!
//! Events are not delivered inline. The flow APIs enqueue a [`crate::tasks::SideEffect::Notify`] and the side-effect
//! worker calls the matching hook, retrying with backoff if it fails. Hooks are stateless: all a handler receives is
//! the event itself.
mod event_types;
mod hooks;

pub use event_types::*;
pub use hooks::{EventHooks, Handler, HookError, HookFuture};
