//! Engine configuration.
//!
//! Set in code, loaded from JSON, or read from the environment:
//! `FROLL_NUM_THREADS` (worker count, default: rayon's choice) and
//! `FROLL_VERBOSE` (`1`/`true` enables informational kernel messages).

use crate::error::{RollError, RollResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads for concurrent dispatch (`None` = one per core)
    pub threads: Option<usize>,
    /// Emit informational kernel messages and timing
    pub verbose: bool,
}

impl EngineConfig {
    pub fn new(threads: Option<usize>, verbose: bool) -> Self {
        EngineConfig { threads, verbose }
    }

    /// Reads `FROLL_NUM_THREADS` and `FROLL_VERBOSE`; unset or unparsable
    /// values fall back to the defaults.
    pub fn from_env() -> Self {
        let threads = std::env::var("FROLL_NUM_THREADS")
            .ok()
            .and_then(|value| value.trim().parse::<usize>().ok())
            .filter(|&threads| threads > 0);
        let verbose = std::env::var("FROLL_VERBOSE")
            .map(|value| parse_flag(&value))
            .unwrap_or(false);

        EngineConfig { threads, verbose }
    }

    pub fn from_json(json: &str) -> RollResult<Self> {
        serde_json::from_str(json).map_err(|err| RollError::InvalidConfig(err.to_string()))
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
