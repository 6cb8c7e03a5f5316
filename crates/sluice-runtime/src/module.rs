//! Script modules: named host functions callable from scripts.
//!
//! A function receives a [`Call`], which gives typed access to its arguments
//! and, for blocking work, [`Call::defer`]: suspend the calling context, queue
//! the operation, and hand the script the pending sentinel.

use crate::context::{ContextId, ExecutionContext};
use crate::error::ScriptError;
use crate::queue::QueueHandle;
use crate::shared::Shared;
use crate::state::{StateGuard, WeakContextRef};
use crate::value::{ScriptObject, ScriptValue};
use crate::work::{Deferred, WorkItem};
use std::sync::Arc;
use tracing::{debug, error};

pub type FunctionHandler = Arc<dyn Fn(&mut Call<'_, '_>) -> ScriptValue + Send + Sync>;

#[derive(Clone)]
pub struct FunctionDecl {
    name: String,
    handler: FunctionHandler,
}

impl FunctionDecl {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn invoke(&self, call: &mut Call<'_, '_>) -> ScriptValue {
        (self.handler)(call)
    }
}

pub fn function<F>(name: &str, handler: F) -> FunctionDecl
where
    F: Fn(&mut Call<'_, '_>) -> ScriptValue + Send + Sync + 'static,
{
    FunctionDecl {
        name: name.to_string(),
        handler: Arc::new(handler),
    }
}

#[derive(Clone)]
pub struct Module {
    name: String,
    functions: Vec<FunctionDecl>,
}

impl Module {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            functions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_functions(mut self, functions: Vec<FunctionDecl>) -> Self {
        self.functions = functions;
        self
    }

    pub fn functions(&self) -> &[FunctionDecl] {
        &self.functions
    }
}

/// Typed access to call arguments.
///
/// Every accessor returns `None` for a missing or mistyped argument, which
/// callers turn into the uniform "Invalid parameters" error.
#[derive(Debug, Clone, Copy)]
pub struct Params<'a> {
    args: &'a [ScriptValue],
}

impl<'a> Params<'a> {
    pub fn new(args: &'a [ScriptValue]) -> Self {
        Self { args }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn value(&self, index: usize) -> Option<&'a ScriptValue> {
        self.args.get(index)
    }

    pub fn string(&self, index: usize) -> Option<&'a str> {
        self.value(index).and_then(ScriptValue::as_str)
    }

    pub fn int(&self, index: usize) -> Option<i64> {
        self.value(index).and_then(ScriptValue::as_int)
    }

    pub fn array(&self, index: usize) -> Option<&'a [ScriptValue]> {
        self.value(index).and_then(ScriptValue::as_array)
    }

    pub fn object<T: ScriptObject>(&self, index: usize) -> Option<Shared<T>> {
        self.value(index).and_then(|v| v.as_object::<T>())
    }
}

/// One invocation of a module function on behalf of a context.
///
/// The global state lock is held for the whole call, so no worker can
/// deliver into this context until the returned value has been pushed.
pub struct Call<'a, 'g> {
    guard: &'a mut StateGuard<'g>,
    context: ContextId,
    args: &'a [ScriptValue],
    queue: &'a QueueHandle,
}

impl<'a, 'g> Call<'a, 'g> {
    pub(crate) fn new(
        guard: &'a mut StateGuard<'g>,
        context: ContextId,
        args: &'a [ScriptValue],
        queue: &'a QueueHandle,
    ) -> Self {
        Self {
            guard,
            context,
            args,
            queue,
        }
    }

    pub fn params(&self) -> Params<'a> {
        Params::new(self.args)
    }

    pub fn context_id(&self) -> ContextId {
        self.context
    }

    pub fn context(&self) -> Option<&ExecutionContext> {
        self.guard.context(self.context)
    }

    pub fn weak_ref(&self) -> WeakContextRef {
        WeakContextRef::new(self.context)
    }

    /// Suspend the calling context. See [`ExecutionContext::suspend`].
    pub fn suspend(&mut self) -> bool {
        self.guard
            .context_mut(self.context)
            .is_some_and(ExecutionContext::suspend)
    }

    /// Run `op` on a worker thread and suspend the caller until it finishes.
    ///
    /// Returns the pending sentinel on success. If the context cannot be
    /// suspended nothing is queued and the script gets
    /// "Script can't be blocked" right away.
    pub fn defer<D: Deferred>(&mut self, op: D) -> ScriptValue {
        if !self.suspend() {
            if let Some(ctx) = self.context() {
                debug!(
                    script = ctx.script_name(),
                    pc = ctx.pc(),
                    op = op.name(),
                    "The execution of this script can't be blocked"
                );
            }
            return ScriptError::NotSuspendable.into_value();
        }

        let item = WorkItem::new(self.weak_ref(), Box::new(op));
        if let Err(e) = self.queue.push(item) {
            error!(error = %e, context = %self.context, "Failed to queue deferred call");
            if let Some(ctx) = self.guard.context_mut(self.context) {
                ctx.abort_suspend();
            }
            return ScriptError::resource(e.to_string()).into_value();
        }

        ScriptValue::PENDING
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Token;

    impl ScriptObject for Token {
        const TYPE_NAME: &'static str = "Token";
    }

    #[test]
    fn test_params_typed_access() {
        let args = vec![
            ScriptValue::from("host"),
            ScriptValue::Int(3),
            ScriptValue::from(vec![ScriptValue::Int(1)]),
            ScriptValue::object(Shared::new(Token)),
        ];
        let params = Params::new(&args);

        assert_eq!(params.string(0), Some("host"));
        assert_eq!(params.string(1), None);
        assert_eq!(params.int(1), Some(3));
        assert_eq!(params.array(2).map(<[_]>::len), Some(1));
        assert!(params.object::<Token>(3).is_some());
        assert!(params.object::<Token>(0).is_none());
        assert!(params.value(9).is_none());
    }
}
