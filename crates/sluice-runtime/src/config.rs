//! Configuration types for the sluice runtime.

use crate::error::{RuntimeError, RuntimeResult};
use serde::Deserialize;

/// Runtime configuration.
///
/// Controls the background service that executes deferred work.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Number of worker threads draining the work queue.
    /// Default: 1, which makes side effects follow submission order.
    pub worker_threads: usize,

    /// Prefix for worker thread names; the worker index is appended.
    /// Default: "sluice-worker"
    pub thread_name_prefix: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: 1,
            thread_name_prefix: "sluice-worker".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.worker_threads = count.max(1);
        self
    }

    /// Set the worker thread name prefix
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Load configuration from a JSON document.
    ///
    /// Missing fields keep their defaults.
    ///
    /// ```
    /// use sluice_runtime::RuntimeConfig;
    ///
    /// let config = RuntimeConfig::from_json(r#"{ "workerThreads": 2 }"#).unwrap();
    /// assert_eq!(config.worker_threads, 2);
    /// ```
    pub fn from_json(json: &str) -> RuntimeResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RuntimeResult<()> {
        if self.worker_threads == 0 {
            return Err(RuntimeError::Config(
                "workerThreads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();
        assert_eq!(config.worker_threads, 1);
        assert_eq!(config.thread_name_prefix, "sluice-worker");
    }

    #[test]
    fn test_builder_pattern() {
        let config = RuntimeConfig::new()
            .worker_threads(0)
            .thread_name_prefix("db");
        assert_eq!(config.worker_threads, 1);
        assert_eq!(config.thread_name_prefix, "db");
    }

    #[test]
    fn test_from_json_rejects_zero_workers() {
        assert!(RuntimeConfig::from_json(r#"{ "workerThreads": 0 }"#).is_err());
        assert!(RuntimeConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_from_json_keeps_defaults() {
        let config = RuntimeConfig::from_json(r#"{ "threadNamePrefix": "sql" }"#).unwrap();
        assert_eq!(config.worker_threads, 1);
        assert_eq!(config.thread_name_prefix, "sql");
    }
}
