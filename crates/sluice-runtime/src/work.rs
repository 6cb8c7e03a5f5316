//! Work items: an operation's owned inputs plus the logic to run it.

use crate::state::{GlobalState, WeakContextRef};
use crate::value::ScriptValue;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, error, info};

/// A blocking operation that runs on a worker thread.
///
/// Implementors own every input they need: plain copies of argument values
/// and [`crate::Shared`] handles for long-lived resources. Nothing may
/// borrow from interpreter memory, which the `'static` bound enforces.
pub trait Deferred: Send + 'static {
    /// Short operation name used in logs
    fn name(&self) -> &'static str;

    /// Perform the operation and produce the value for the result slot
    fn run(self: Box<Self>) -> ScriptValue;
}

/// Adapter so that plain closures can be deferred
pub struct DeferredFn<F> {
    name: &'static str,
    f: F,
}

impl<F> Deferred for DeferredFn<F>
where
    F: FnOnce() -> ScriptValue + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn run(self: Box<Self>) -> ScriptValue {
        (self.f)()
    }
}

pub fn deferred_fn<F>(name: &'static str, f: F) -> DeferredFn<F>
where
    F: FnOnce() -> ScriptValue + Send + 'static,
{
    DeferredFn { name, f }
}

/// What happened to a work item's result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Written into the result slot and the context revived
    Delivered,
    /// The context was destroyed first; the result was discarded
    Dropped,
    /// The context exists but was not waiting for a result
    Rejected,
}

/// Outcome of executing one work item, used for queue statistics
#[derive(Debug, Clone, Copy)]
pub struct Execution {
    pub delivery: Delivery,
    pub panicked: bool,
}

/// Snapshot of one deferred call, created at submission time
pub struct WorkItem {
    target: WeakContextRef,
    op: Box<dyn Deferred>,
}

impl WorkItem {
    pub fn new(target: WeakContextRef, op: Box<dyn Deferred>) -> Self {
        Self { target, op }
    }

    pub fn target(&self) -> WeakContextRef {
        self.target
    }

    pub fn name(&self) -> &'static str {
        self.op.name()
    }

    /// Run the operation, then deliver its result under the global lock
    pub(crate) fn execute(self, state: &GlobalState) -> Execution {
        let WorkItem { target, op } = self;
        let name = op.name();

        let (value, panicked) = match catch_unwind(AssertUnwindSafe(|| op.run())) {
            Ok(value) => (value, false),
            Err(panic) => {
                let message = if let Some(s) = panic.downcast_ref::<&str>() {
                    format!("Worker panic: {}", s)
                } else if let Some(s) = panic.downcast_ref::<String>() {
                    format!("Worker panic: {}", s)
                } else {
                    "Worker panic: unknown error".to_string()
                };
                error!(op = name, context = %target.id(), "{}", message);
                (ScriptValue::Error(message), true)
            }
        };

        let mut guard = state.lock();
        if !target.exists(&guard) {
            drop(guard);
            info!(op = name, context = %target.id(), "Script has been destroyed");
            // Anything the result owns (a fresh connection, a result set) is
            // released here, outside the lock.
            drop(value);
            return Execution {
                delivery: Delivery::Dropped,
                panicked,
            };
        }

        let delivery = match guard.revive(target, value) {
            Ok(()) => {
                drop(guard);
                debug!(op = name, context = %target.id(), "Result delivered");
                Delivery::Delivered
            }
            Err((refused, e)) => {
                drop(guard);
                error!(op = name, error = %e, "Revive contract violated");
                drop(refused);
                Delivery::Rejected
            }
        };

        Execution {
            delivery,
            panicked,
        }
    }
}

impl std::fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkItem")
            .field("target", &self.target.id())
            .field("op", &self.op.name())
            .finish()
    }
}
