//! Engine configuration.
//!
//! Plain struct with defaults and a `validate()` pass; values come from the
//! CLI, not from ambient globals. The completion credential lives in the
//! completer collaborator, not here.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Knobs for one typing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of full-file passes before giving up. `-1` = unlimited.
    pub max_tries: i64,
    /// Prompt budget in estimated tokens; the isolator shortens context to fit.
    pub token_budget: usize,
    /// Maximum tokens the completer may generate per signature.
    pub max_output_tokens: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_tries: 3,
            token_budget: 2048,
            max_output_tokens: 64,
        }
    }
}

impl EngineConfig {
    /// Validate config sanity (no degenerate or absurd values).
    pub fn validate(&self) -> Result<()> {
        if self.max_tries == 0 || self.max_tries < -1 {
            return Err(ConfigError::OutOfRange {
                field: "max_tries",
                detail: "expected a positive pass count or -1 for unlimited",
            }
            .into());
        }
        if self.token_budget == 0 {
            return Err(ConfigError::OutOfRange {
                field: "token_budget",
                detail: "must be greater than 0",
            }
            .into());
        }
        if self.max_output_tokens == 0 {
            return Err(ConfigError::OutOfRange {
                field: "max_output_tokens",
                detail: "must be greater than 0",
            }
            .into());
        }
        Ok(())
    }

    /// Whether the try budget ever runs out.
    pub fn unlimited_tries(&self) -> bool {
        self.max_tries == -1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_tries_rejected() {
        let cfg = EngineConfig {
            max_tries: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unlimited_tries_accepted() {
        let cfg = EngineConfig {
            max_tries: -1,
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
        assert!(cfg.unlimited_tries());
    }
}
