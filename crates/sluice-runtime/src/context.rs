//! Execution contexts: the suspendable unit of script execution.

use crate::error::ContextError;
use crate::value::ScriptValue;
use std::fmt;

/// Identifier of an execution context.
///
/// Ids are handed out from a monotonically increasing counter and are never
/// reused, which is what lets a [`crate::WeakContextRef`] answer "does my
/// context still exist" by a plain table lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Running,
    Suspended,
}

/// Options for a new execution context
#[derive(Debug, Clone, Copy)]
pub struct ContextOptions {
    /// Whether the context may yield while a deferred call is outstanding.
    /// Run-to-completion scripts set this to false.
    pub suspendable: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self { suspendable: true }
    }
}

impl ContextOptions {
    pub fn run_to_completion() -> Self {
        Self { suspendable: false }
    }
}

#[derive(Debug)]
pub struct ExecutionContext {
    id: ContextId,
    script_name: String,
    /// Count of calls executed so far, reported in diagnostics
    pc: u64,
    stack: Vec<ScriptValue>,
    state: ContextState,
    suspendable: bool,
}

impl ExecutionContext {
    pub(crate) fn new(id: ContextId, script_name: &str, options: ContextOptions) -> Self {
        Self {
            id,
            script_name: script_name.to_string(),
            pc: 0,
            stack: Vec::new(),
            state: ContextState::Running,
            suspendable: options.suspendable,
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    pub fn pc(&self) -> u64 {
        self.pc
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn is_suspended(&self) -> bool {
        self.state == ContextState::Suspended
    }

    pub fn is_suspendable(&self) -> bool {
        self.suspendable
    }

    /// The result slot: the top of the value stack
    pub fn result(&self) -> Option<&ScriptValue> {
        self.stack.last()
    }

    pub fn stack(&self) -> &[ScriptValue] {
        &self.stack
    }

    pub fn push(&mut self, value: ScriptValue) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Option<ScriptValue> {
        self.stack.pop()
    }

    pub(crate) fn advance_pc(&mut self) {
        self.pc += 1;
    }

    /// Yield pending an asynchronous result.
    ///
    /// Returns false when the context cannot be suspended, either because it
    /// runs to completion or because it is already waiting on a result.
    pub fn suspend(&mut self) -> bool {
        if !self.suspendable || self.state == ContextState::Suspended {
            return false;
        }
        self.state = ContextState::Suspended;
        true
    }

    /// Undo a suspension whose work item never made it onto the queue
    pub(crate) fn abort_suspend(&mut self) {
        self.state = ContextState::Running;
    }

    /// Write the outcome into the result slot and make the context runnable.
    ///
    /// Must only be reached through [`crate::StateGuard::revive`], which holds
    /// the global state lock. A refused value is handed back to the caller.
    pub(crate) fn revive(&mut self, value: ScriptValue) -> Result<(), (ScriptValue, ContextError)> {
        if self.state != ContextState::Suspended {
            return Err((value, ContextError::NotSuspended(self.id)));
        }
        let Some(slot) = self.stack.last_mut() else {
            return Err((value, ContextError::NoResultSlot(self.id)));
        };
        *slot = value;
        self.state = ContextState::Running;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(options: ContextOptions) -> ExecutionContext {
        ExecutionContext::new(ContextId::new(1), "test.src", options)
    }

    #[test]
    fn test_suspend_revive_cycle() {
        let mut ctx = context(ContextOptions::default());
        assert!(ctx.suspend());
        ctx.push(ScriptValue::PENDING);
        assert!(ctx.is_suspended());

        ctx.revive(ScriptValue::Int(42)).unwrap();
        assert_eq!(ctx.state(), ContextState::Running);
        assert_eq!(ctx.result(), Some(&ScriptValue::Int(42)));
        assert_eq!(ctx.stack().len(), 1);
    }

    #[test]
    fn test_suspend_refused_when_run_to_completion() {
        let mut ctx = context(ContextOptions::run_to_completion());
        assert!(!ctx.suspend());
        assert_eq!(ctx.state(), ContextState::Running);
    }

    #[test]
    fn test_double_suspend_refused() {
        let mut ctx = context(ContextOptions::default());
        assert!(ctx.suspend());
        assert!(!ctx.suspend());
    }

    #[test]
    fn test_revive_without_suspend_is_violation() {
        let mut ctx = context(ContextOptions::default());
        ctx.push(ScriptValue::PENDING);
        assert_eq!(
            ctx.revive(ScriptValue::Int(1)),
            Err((ScriptValue::Int(1), ContextError::NotSuspended(ctx.id())))
        );
        assert_eq!(ctx.result(), Some(&ScriptValue::PENDING));
    }

    #[test]
    fn test_second_revive_is_violation() {
        let mut ctx = context(ContextOptions::default());
        assert!(ctx.suspend());
        ctx.push(ScriptValue::PENDING);
        ctx.revive(ScriptValue::Int(1)).unwrap();
        assert!(ctx.revive(ScriptValue::Int(2)).is_err());
        assert_eq!(ctx.result(), Some(&ScriptValue::Int(1)));
    }
}
