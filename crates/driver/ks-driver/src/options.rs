//! Compiler options, loadable from `Kestrel.toml`

use anyhow::{Context, Result};
use ks_const_eval::{DEFAULT_MAX_CALL_DEPTH, DEFAULT_MAX_STEPS, EvalLimits};
use ks_index::{DEFAULT_MAX_ROUNDS, IndexOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Name of the configuration file looked up next to the entry file
pub const CONFIG_FILE: &str = "Kestrel.toml";

/// All compiler options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// Macro expansion limits
    pub macros: MacroOptions,
    /// Constant evaluation limits
    pub const_eval: ConstEvalOptions,
}

/// `[macros]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MacroOptions {
    /// Nested expansion depth
    pub max_depth: usize,
    /// Fixed-point rounds for item macros
    pub max_rounds: usize,
}

impl Default for MacroOptions {
    fn default() -> Self {
        let defaults = IndexOptions::default();
        Self {
            max_depth: defaults.max_depth,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

/// `[const_eval]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConstEvalOptions {
    /// Expressions evaluated per constant
    pub max_steps: u64,
    /// Nested `const fn` calls
    pub max_call_depth: usize,
}

impl Default for ConstEvalOptions {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl Options {
    /// Parses options from TOML text; missing keys keep their defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or has unknown keys
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse compiler options")
    }

    /// Loads options from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let options = Self::from_toml_str(&contents)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded options");
        Ok(options)
    }

    /// Loads `Kestrel.toml` from the directory of `entry`, or returns the
    /// defaults if there is none
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn discover(entry: impl AsRef<Path>) -> Result<Self> {
        let dir = entry.as_ref().parent().unwrap_or_else(|| Path::new("."));
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            Self::load(candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Limits handed to the indexer
    #[must_use]
    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            max_depth: self.macros.max_depth,
            max_rounds: self.macros.max_rounds,
        }
    }

    /// Limits handed to the constant evaluator
    #[must_use]
    pub fn eval_limits(&self) -> EvalLimits {
        EvalLimits {
            max_steps: self.const_eval.max_steps,
            max_call_depth: self.const_eval.max_call_depth,
        }
    }
}
