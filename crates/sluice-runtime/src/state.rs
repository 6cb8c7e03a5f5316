//! The global state lock and weak context references.
//!
//! Every read or write of an [`ExecutionContext`] goes through a
//! [`StateGuard`], whichever thread performs it. The interpreter holds the
//! guard while a script call runs; workers take it only to deliver a result,
//! so deliveries are serialized and a resumed context is never seen
//! half-written.
//!
//! Workers reach contexts only through a [`WeakContextRef`]. Its queries take
//! the guard as an argument, so "lock, then check existence, then
//! dereference" is the only order the compiler accepts, and a positive
//! existence check cannot outlive the lock.

use crate::context::{ContextId, ContextOptions, ExecutionContext};
use crate::error::ContextError;
use crate::value::ScriptValue;
use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct ContextTable {
    contexts: HashMap<ContextId, ExecutionContext>,
}

/// Shared state of one interpreter: the context table behind the lock and
/// the run queue revived contexts are announced on.
#[derive(Debug)]
pub struct GlobalState {
    table: Mutex<ContextTable>,
    next_id: AtomicU64,
    runnable_tx: Sender<ContextId>,
    runnable_rx: Receiver<ContextId>,
}

impl GlobalState {
    pub fn new() -> Arc<Self> {
        let (runnable_tx, runnable_rx) = unbounded();
        Arc::new(Self {
            table: Mutex::new(ContextTable::default()),
            next_id: AtomicU64::new(1),
            runnable_tx,
            runnable_rx,
        })
    }

    /// Acquire the global state lock
    pub fn lock(&self) -> StateGuard<'_> {
        StateGuard {
            table: self.table.lock(),
            state: self,
        }
    }

    /// Wait for the next context announced as runnable
    pub(crate) fn next_runnable(&self, timeout: Duration) -> Option<ContextId> {
        self.runnable_rx.recv_timeout(timeout).ok()
    }

    /// Announcements not yet consumed
    pub fn runnable_len(&self) -> usize {
        self.runnable_rx.len()
    }

    /// Discard every pending announcement, returning how many there were
    pub(crate) fn drain_runnable(&self) -> usize {
        self.runnable_rx.try_iter().count()
    }

    #[cfg(test)]
    pub(crate) fn is_locked(&self) -> bool {
        self.table.is_locked()
    }
}

/// Proof that the global state lock is held
pub struct StateGuard<'a> {
    table: MutexGuard<'a, ContextTable>,
    state: &'a GlobalState,
}

impl StateGuard<'_> {
    pub fn create(&mut self, script_name: &str, options: ContextOptions) -> ContextId {
        let id = ContextId::new(self.state.next_id.fetch_add(1, Ordering::Relaxed));
        self.table
            .contexts
            .insert(id, ExecutionContext::new(id, script_name, options));
        id
    }

    pub fn context(&self, id: ContextId) -> Option<&ExecutionContext> {
        self.table.contexts.get(&id)
    }

    pub fn context_mut(&mut self, id: ContextId) -> Option<&mut ExecutionContext> {
        self.table.contexts.get_mut(&id)
    }

    /// Remove a context from the table.
    ///
    /// The caller should let the returned context drop after releasing the
    /// guard, since its stack may hold the last reference to a resource.
    pub fn destroy(&mut self, id: ContextId) -> Option<ExecutionContext> {
        self.table.contexts.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.table.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.contexts.is_empty()
    }

    /// Deliver a result to a suspended context and announce it as runnable.
    ///
    /// A refused value comes back with the error so the caller can release
    /// it after dropping the guard.
    pub fn revive(
        &mut self,
        target: WeakContextRef,
        value: ScriptValue,
    ) -> Result<(), (ScriptValue, ContextError)> {
        let Some(ctx) = target.get_mut(self) else {
            // Callers check existence first; a vanished context is not a violation.
            return Ok(());
        };
        ctx.revive(value)?;
        let _ = self.state.runnable_tx.send(target.id());
        Ok(())
    }
}

/// Non-owning handle to an execution context that may be destroyed at any time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeakContextRef {
    id: ContextId,
}

impl WeakContextRef {
    pub fn new(id: ContextId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Whether the context still exists. Valid only while `guard` is held.
    pub fn exists(&self, guard: &StateGuard<'_>) -> bool {
        guard.table.contexts.contains_key(&self.id)
    }

    pub fn get<'g>(&self, guard: &'g StateGuard<'_>) -> Option<&'g ExecutionContext> {
        guard.table.contexts.get(&self.id)
    }

    pub fn get_mut<'g>(&self, guard: &'g mut StateGuard<'_>) -> Option<&'g mut ExecutionContext> {
        guard.table.contexts.get_mut(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weak_ref_tracks_destruction() {
        let state = GlobalState::new();
        let mut guard = state.lock();
        let id = guard.create("a.src", ContextOptions::default());
        let weak = WeakContextRef::new(id);

        assert!(weak.exists(&guard));
        assert_eq!(weak.get(&guard).map(|c| c.script_name()), Some("a.src"));

        let removed = guard.destroy(id);
        assert!(removed.is_some());
        assert!(!weak.exists(&guard));
        assert!(weak.get_mut(&mut guard).is_none());
    }

    #[test]
    fn test_ids_are_not_reused() {
        let state = GlobalState::new();
        let mut guard = state.lock();
        let first = guard.create("a.src", ContextOptions::default());
        guard.destroy(first);
        let second = guard.create("a.src", ContextOptions::default());
        assert_ne!(first, second);
        assert!(!WeakContextRef::new(first).exists(&guard));
    }

    #[test]
    fn test_revive_announces_runnable() {
        let state = GlobalState::new();
        let id = {
            let mut guard = state.lock();
            let id = guard.create("a.src", ContextOptions::default());
            let ctx = guard.context_mut(id).unwrap();
            assert!(ctx.suspend());
            ctx.push(ScriptValue::PENDING);
            guard
                .revive(WeakContextRef::new(id), ScriptValue::Int(7))
                .unwrap();
            id
        };

        assert_eq!(state.next_runnable(Duration::from_millis(100)), Some(id));
        let guard = state.lock();
        assert_eq!(
            guard.context(id).and_then(|c| c.result()),
            Some(&ScriptValue::Int(7))
        );
    }

    #[test]
    fn test_revive_of_running_context_is_rejected() {
        let state = GlobalState::new();
        let mut guard = state.lock();
        let id = guard.create("a.src", ContextOptions::default());
        guard.context_mut(id).unwrap().push(ScriptValue::Int(1));
        assert_eq!(
            guard.revive(WeakContextRef::new(id), ScriptValue::Int(2)),
            Err((ScriptValue::Int(2), ContextError::NotSuspended(id)))
        );
        drop(guard);
        assert_eq!(state.next_runnable(Duration::from_millis(10)), None);
    }
}
