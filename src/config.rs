//! Engine configuration.
//!
//! ```rust
//! use bitpeg::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{ "max_recursion_depth": 64 }"#).unwrap();
//! assert_eq!(config.max_recursion_depth, 64);
//! assert!(config.memoize);
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Default bound on nested indirect calls within one run.
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 1000;

/// Settings for a single engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum nesting of indirect (recursive) calls before the run fails with
    /// a recursion-limit failure.
    pub max_recursion_depth: usize,
    /// Whether `(node, position)` results are memoized. Turning this off keeps
    /// the semantics but loses the linear-time guarantee.
    pub memoize: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            memoize: true,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursion_depth = depth;
        self
    }

    pub fn with_memoize(mut self, memoize: bool) -> Self {
        self.memoize = memoize;
        self
    }

    /// Parses a JSON configuration; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_recursion_depth == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_recursion_depth",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn rejects_unknown_fields_and_zero_depth() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "depth": 3 }"#),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "max_recursion_depth": 0 }"#),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
