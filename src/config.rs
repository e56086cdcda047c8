//! Interpreter configuration
//!
//! Configuration is plain data with serde support so that batch runs can
//! keep it next to their scripts as JSON.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Encoding of production references inside grammar component automata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RtnConvention {
    /// Reference arcs carry the negative production label on both sides.
    #[default]
    OpenFst,
    /// Reference arcs carry the negative label on the input side and epsilon
    /// on the output side.
    Sap,
}

/// Configuration for an [`Interpreter`](crate::interpreter::Interpreter)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Reference-arc encoding used by the grammar linker
    pub rtn_convention: RtnConvention,

    /// Maximum number of strings reported when a net is printed or listed
    pub max_enumerated_strings: usize,

    /// Maximum number of arcs followed per enumerated path
    pub max_string_length: usize,

    /// Stop running a program at the first failing top-level statement
    pub halt_on_error: bool,

    /// Seed for random path generation (a fresh UUID is used when absent)
    pub random_seed: Option<u64>,

    /// Log every top-level statement as it runs
    pub trace: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            rtn_convention: RtnConvention::OpenFst,
            max_enumerated_strings: 100,
            max_string_length: 64,
            halt_on_error: false,
            random_seed: None,
            trace: false,
        }
    }
}

impl InterpreterConfig {
    /// Load a configuration file. Missing fields take their default values.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: InterpreterConfig =
            serde_json::from_slice(&data).context("Failed to deserialize config")?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn store(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Seed for the random path generator.
    pub fn seed(&self) -> u64 {
        self.random_seed
            .unwrap_or_else(|| uuid::Uuid::new_v4().as_u64_pair().0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn partial_files_fall_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("kleene.json");
        std::fs::write(&path, r#"{ "rtn_convention": "sap", "halt_on_error": true }"#).unwrap();

        let config = InterpreterConfig::load(&path).unwrap();
        assert_eq!(config.rtn_convention, RtnConvention::Sap);
        assert!(config.halt_on_error);
        assert_eq!(config.max_enumerated_strings, 100);
        assert_eq!(config.random_seed, None);
    }

    #[test]
    fn stored_config_loads_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("kleene.json");
        let config = InterpreterConfig {
            random_seed: Some(42),
            trace: true,
            ..InterpreterConfig::default()
        };
        config.store(&path).unwrap();
        assert_eq!(InterpreterConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_reported() {
        let temp = TempDir::new().unwrap();
        let err = InterpreterConfig::load(&temp.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn explicit_seed_is_used() {
        let config = InterpreterConfig {
            random_seed: Some(7),
            ..InterpreterConfig::default()
        };
        assert_eq!(config.seed(), 7);
    }
}
