//! Configuration for the SQL module

use crate::error::SqlResult;
use serde::Deserialize;

/// Environment variable that switches the SQL functions off
pub const DISABLE_ENV: &str = "SLUICE_SQL_DISABLED";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SqlConfig {
    /// When false every SQL function answers "Feature not available".
    /// Default: true
    pub enabled: bool,
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl SqlConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Defaults, overridden by `SLUICE_SQL_DISABLED`
    pub fn from_env() -> Self {
        let disabled = std::env::var(DISABLE_ENV)
            .map(|v| is_truthy(&v))
            .unwrap_or(false);
        Self { enabled: !disabled }
    }

    /// Load configuration from a JSON document
    pub fn from_json(json: &str) -> SqlResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_by_default() {
        assert!(SqlConfig::default().enabled);
        assert!(!SqlConfig::new().enabled(false).enabled);
    }

    #[test]
    fn test_from_json() {
        assert!(!SqlConfig::from_json(r#"{ "enabled": false }"#).unwrap().enabled);
        assert!(SqlConfig::from_json("{}").unwrap().enabled);
        assert!(SqlConfig::from_json("[").is_err());
    }

    #[test]
    fn test_truthy_values() {
        assert!(is_truthy("1"));
        assert!(is_truthy(" TRUE "));
        assert!(!is_truthy("0"));
        assert!(!is_truthy(""));
    }
}
