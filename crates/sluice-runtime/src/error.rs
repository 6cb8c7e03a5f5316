//! Error types for sluice-runtime
//!
//! Two families live here: [`ScriptError`] is what a script observes in its
//! result slot, [`RuntimeError`] is what the embedding host sees from the
//! runtime's own plumbing. They never mix.

use crate::context::ContextId;
use crate::value::ScriptValue;
use thiserror::Error;

/// Errors delivered to a script as a tagged return value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// Missing or malformed call arguments, reported before anything is queued
    #[error("Invalid parameters")]
    Parameter,

    /// The calling context cannot be suspended right now
    #[error("Script can't be blocked")]
    NotSuspendable,

    /// A new resource could not be constructed
    #[error("{0}")]
    Resource(String),

    /// The deferred operation itself failed
    #[error("{0}")]
    Operation(String),

    /// The capability set was compiled or configured out
    #[error("Feature not available")]
    Unavailable,
}

impl ScriptError {
    /// Create an operation error from any displayable diagnostic
    pub fn operation(message: impl ToString) -> Self {
        Self::Operation(message.to_string())
    }

    /// Create a resource error
    pub fn resource(message: impl Into<String>) -> Self {
        Self::Resource(message.into())
    }

    /// Render this error as the value a script sees
    pub fn into_value(self) -> ScriptValue {
        ScriptValue::Error(self.to_string())
    }
}

impl From<ScriptError> for ScriptValue {
    fn from(err: ScriptError) -> Self {
        err.into_value()
    }
}

/// Errors raised by the runtime itself
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A worker thread could not be spawned
    #[error("Failed to spawn worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// The work queue no longer accepts items
    #[error("Work queue is closed")]
    QueueClosed,

    /// The context id does not name a live context
    #[error("Unknown execution context {0}")]
    UnknownContext(ContextId),

    /// The context is waiting on a deferred result and cannot run
    #[error("Execution context {0} is suspended")]
    ContextSuspended(ContextId),

    /// No registered module exports this function
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// A function name was registered twice
    #[error("Function already registered: {0}")]
    DuplicateFunction(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for RuntimeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e.to_string())
    }
}

/// Contract violations of the suspend/revive protocol
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    /// `revive` was called on a context that is not suspended
    #[error("Context {0} is not suspended")]
    NotSuspended(ContextId),

    /// The context has an empty value stack, so there is no result slot
    #[error("Context {0} has no result slot")]
    NoResultSlot(ContextId),
}

/// Result type alias for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Result type alias for script-level operations
pub type ScriptResult<T> = Result<T, ScriptError>;
