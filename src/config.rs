use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

use crate::{Error, Result};

/// Runtime limits and switches for a [`crate::runtime::Vm`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmConfig {
    /// Iterations a single `while` loop may run before failing.
    #[serde(default = "default_max_loop_iterations")]
    pub max_loop_iterations: usize,

    /// Nested user function calls allowed at once. The default fits a
    /// 2 MiB thread stack in debug builds.
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,

    /// Events a rule or handler may emit inside the dispatch of another
    /// event before the outer `emit`/`tick` fails.
    #[serde(default = "default_max_emit_depth")]
    pub max_emit_depth: usize,

    /// State key holding the current entity during entity-scoped dispatch.
    #[serde(default = "default_entity_context_key")]
    pub entity_context_key: String,

    /// Write `delta` and `tickCount` into state on every tick.
    #[serde(default = "default_true")]
    pub publish_tick_state: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_loop_iterations: default_max_loop_iterations(),
            max_call_depth: default_max_call_depth(),
            max_emit_depth: default_max_emit_depth(),
            entity_context_key: default_entity_context_key(),
            publish_tick_state: default_true(),
        }
    }
}

impl VmConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::Internal(format!("Failed to open config file: {}", e)))?;
        let reader = BufReader::new(file);
        let config = serde_json::from_reader(reader)?;
        Ok(config)
    }

    pub fn from_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

fn default_max_loop_iterations() -> usize {
    10_000
}
fn default_max_call_depth() -> usize {
    32
}
fn default_max_emit_depth() -> usize {
    16
}
fn default_entity_context_key() -> String {
    "_entity".to_string()
}
fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = VmConfig::from_str(r#"{ "max_loop_iterations": 50 }"#).unwrap();
        assert_eq!(config.max_loop_iterations, 50);
        assert_eq!(config.max_call_depth, 32);
        assert_eq!(config.max_emit_depth, 16);
        assert_eq!(config.entity_context_key, "_entity");
        assert!(config.publish_tick_state);
    }

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(VmConfig::from_str("{}").unwrap(), VmConfig::default());
    }

    #[test]
    fn test_from_missing_file() {
        let err = VmConfig::from_file("/nonexistent/vm.json").unwrap_err();
        assert!(err.to_string().contains("Failed to open config file"));
    }
}
