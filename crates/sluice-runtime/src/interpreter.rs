//! Cooperative interpreter front end
//!
//! Owns the context table, the module function registry and the background
//! work queue. A single interpreter thread drives many contexts: it calls
//! module functions on behalf of one context at a time, and picks up
//! contexts announced as runnable once a worker has revived them.
//!
//! # Example
//!
//! ```no_run
//! use sluice_runtime::{Interpreter, Module, RuntimeConfig, ScriptValue, deferred_fn, function};
//! use std::time::Duration;
//!
//! let mut interp = Interpreter::new(RuntimeConfig::default()).unwrap();
//! interp
//!     .register_module(Module::new("demo").with_functions(vec![function("slow", |call| {
//!         call.defer(deferred_fn("slow", || ScriptValue::Int(1)))
//!     })]))
//!     .unwrap();
//!
//! let ctx = interp.spawn("main.src");
//! assert_eq!(interp.call(ctx, "slow", vec![]).unwrap(), ScriptValue::PENDING);
//! let result = interp.wait_for(ctx, Duration::from_secs(1));
//! assert_eq!(result, Some(ScriptValue::Int(1)));
//! ```

use crate::config::RuntimeConfig;
use crate::context::{ContextId, ContextOptions};
use crate::error::{RuntimeError, RuntimeResult};
use crate::module::{Call, FunctionDecl, Module};
use crate::queue::{QueueHandle, QueueStatsSnapshot, WorkQueue};
use crate::state::GlobalState;
use crate::value::ScriptValue;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Single-threaded front end over the shared context table.
///
/// Every revive announces its context on an unbounded run queue. Hosts that
/// drive contexts through [`Interpreter::next_runnable`] or
/// [`Interpreter::wait_for`] consume those announcements as they go; a host
/// that only polls [`Interpreter::is_suspended`] should call
/// [`Interpreter::discard_runnable`] now and then, or the queue keeps one
/// entry per delivered result.
pub struct Interpreter {
    state: Arc<GlobalState>,
    queue: WorkQueue,
    queue_handle: QueueHandle,
    functions: HashMap<String, FunctionDecl>,
}

impl Interpreter {
    pub fn new(config: RuntimeConfig) -> RuntimeResult<Self> {
        let state = GlobalState::new();
        let queue = WorkQueue::start(&config, state.clone())?;
        let queue_handle = queue.handle();
        Ok(Self {
            state,
            queue,
            queue_handle,
            functions: HashMap::new(),
        })
    }

    /// Register every function exported by `module`
    pub fn register_module(&mut self, module: Module) -> RuntimeResult<()> {
        debug!(
            module = module.name(),
            functions = module.functions().len(),
            "Registering module"
        );

        for decl in module.functions() {
            if self.functions.contains_key(decl.name()) {
                return Err(RuntimeError::DuplicateFunction(decl.name().to_string()));
            }
        }
        for decl in module.functions() {
            self.functions.insert(decl.name().to_string(), decl.clone());
        }
        Ok(())
    }

    /// Start a new suspendable context
    pub fn spawn(&self, script_name: &str) -> ContextId {
        self.spawn_with(script_name, ContextOptions::default())
    }

    pub fn spawn_with(&self, script_name: &str, options: ContextOptions) -> ContextId {
        let id = self.state.lock().create(script_name, options);
        trace!(context = %id, script = script_name, "Context created");
        id
    }

    /// Tear a context down. Work still queued for it will find it gone.
    pub fn destroy(&self, id: ContextId) -> bool {
        let removed = self.state.lock().destroy(id);
        // The stack may hold the last reference to a resource; let it go
        // after the lock is released.
        let existed = removed.is_some();
        drop(removed);
        if existed {
            trace!(context = %id, "Context destroyed");
        }
        existed
    }

    /// Call a module function on behalf of `id` and push its return value
    /// onto the context's value stack.
    ///
    /// Deferred functions return [`ScriptValue::PENDING`]; the real result
    /// replaces it in the result slot once a worker revives the context.
    pub fn call(
        &self,
        id: ContextId,
        function: &str,
        args: Vec<ScriptValue>,
    ) -> RuntimeResult<ScriptValue> {
        let decl = self
            .functions
            .get(function)
            .ok_or_else(|| RuntimeError::UnknownFunction(function.to_string()))?;

        let mut guard = self.state.lock();
        match guard.context_mut(id) {
            Some(ctx) if ctx.is_suspended() => return Err(RuntimeError::ContextSuspended(id)),
            Some(ctx) => ctx.advance_pc(),
            None => return Err(RuntimeError::UnknownContext(id)),
        }

        let value = {
            let mut call = Call::new(&mut guard, id, &args, &self.queue_handle);
            decl.invoke(&mut call)
        };

        if let Some(ctx) = guard.context_mut(id) {
            ctx.push(value.clone());
        }
        drop(guard);
        drop(args);

        Ok(value)
    }

    /// Current content of the context's result slot
    pub fn result(&self, id: ContextId) -> Option<ScriptValue> {
        self.state
            .lock()
            .context(id)
            .and_then(|ctx| ctx.result().cloned())
    }

    /// Pop the result slot, as a script does when it consumes a return value
    pub fn take_result(&self, id: ContextId) -> Option<ScriptValue> {
        let mut guard = self.state.lock();
        let ctx = guard.context_mut(id)?;
        if ctx.is_suspended() {
            return None;
        }
        ctx.pop()
    }

    pub fn is_suspended(&self, id: ContextId) -> Option<bool> {
        self.state.lock().context(id).map(|ctx| ctx.is_suspended())
    }

    pub fn exists(&self, id: ContextId) -> bool {
        self.state.lock().context(id).is_some()
    }

    /// Next context revived by a worker that still exists
    pub fn next_runnable(&self, timeout: Duration) -> Option<ContextId> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let id = self.state.next_runnable(remaining)?;
            if self.exists(id) {
                return Some(id);
            }
        }
    }

    /// Block until `id` is no longer suspended and return its result slot.
    ///
    /// Returns `None` on timeout or if the context is destroyed meanwhile.
    /// Run-queue announcements consumed while waiting are not replayed;
    /// other contexts can still be inspected through [`Self::is_suspended`].
    pub fn wait_for(&self, id: ContextId, timeout: Duration) -> Option<ScriptValue> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.is_suspended(id) {
                None => return None,
                Some(false) => return self.result(id),
                Some(true) => {}
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            // Any announcement is a cue to re-check; the state is authoritative.
            let _ = self.state.next_runnable(remaining.min(Duration::from_millis(10)));
        }
    }

    /// Run-queue announcements not yet consumed
    pub fn runnable_len(&self) -> usize {
        self.state.runnable_len()
    }

    /// Drop every pending run-queue announcement.
    ///
    /// Context state is unaffected; it is still readable through
    /// [`Self::is_suspended`] and [`Self::result`].
    pub fn discard_runnable(&self) -> usize {
        self.state.drain_runnable()
    }

    pub fn state(&self) -> &Arc<GlobalState> {
        &self.state
    }

    pub fn queue(&self) -> QueueHandle {
        self.queue_handle.clone()
    }

    /// Number of work items waiting for a worker
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn stats(&self) -> QueueStatsSnapshot {
        self.queue.stats().snapshot()
    }

    /// Stop the background service after draining queued work
    pub fn shutdown(self) {
        let Interpreter {
            queue,
            queue_handle,
            ..
        } = self;
        drop(queue_handle);
        queue.shutdown();
    }
}
