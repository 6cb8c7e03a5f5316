//! sluice-runtime - deferred-operation bridge for a cooperative interpreter.
//!
//! Scripts run on one interpreter thread and must never block it. When a
//! script calls something slow (a database round trip, a network call), the
//! calling context is suspended, the operation is queued for a background
//! worker, and other contexts keep running. The worker later writes the
//! outcome into the context's result slot and revives it, unless the
//! context was destroyed in the meantime, in which case the result is
//! dropped.
//!
//! # Features
//!
//! - **Suspend/revive**: exactly one revive per successful suspend, or none
//!   if the context is gone
//! - **Weak context references**: existence checks and dereferences only
//!   compile while the global state lock is held
//! - **Shared handles**: resources stay alive while queued work uses them
//! - **FIFO work queue**: a fixed background service, ordered execution
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐         ┌──────────────────────────┐
//! │ Interpreter thread           │         │ Worker thread(s)         │
//! │                              │  push   │                          │
//! │ call() ─ suspend ─ WorkItem ─┼────────►│ pop ─ Deferred::run()    │
//! │   ▲                          │         │            │             │
//! │   │ next_runnable()          │         │  lock ─ exists()?        │
//! │   │                          │         │   yes: revive(result)    │
//! │   └──────── run queue ◄──────┼─────────┤   no:  drop result       │
//! └──────────────────────────────┘         └──────────────────────────┘
//!                  │                                   │
//!                  └──────── GlobalState lock ─────────┘
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod interpreter;
pub mod module;
pub mod queue;
pub mod shared;
pub mod state;
pub mod value;
pub mod work;

pub use config::RuntimeConfig;
pub use context::{ContextId, ContextOptions, ContextState, ExecutionContext};
pub use error::{ContextError, RuntimeError, RuntimeResult, ScriptError, ScriptResult};
pub use interpreter::Interpreter;
pub use module::{Call, FunctionDecl, FunctionHandler, Module, Params, function};
pub use queue::{QueueHandle, QueueStats, QueueStatsSnapshot, WorkQueue};
pub use shared::Shared;
pub use state::{GlobalState, StateGuard, WeakContextRef};
pub use value::{ObjectRef, ScriptObject, ScriptValue};
pub use work::{Deferred, DeferredFn, Delivery, WorkItem, deferred_fn};

pub mod prelude {
    pub use crate::config::RuntimeConfig;
    pub use crate::context::{ContextId, ContextOptions};
    pub use crate::error::{RuntimeError, RuntimeResult, ScriptError, ScriptResult};
    pub use crate::interpreter::Interpreter;
    pub use crate::module::{Call, Module, Params, function};
    pub use crate::shared::Shared;
    pub use crate::value::{ScriptObject, ScriptValue};
    pub use crate::work::{Deferred, deferred_fn};
}
