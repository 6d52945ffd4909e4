//! Configuration loading and typed config structures for the Exuvia engine.
//!
//! The canonical configuration lives in `exuvia-config.yaml` at the project
//! root. Every field has a serde default, so an empty document is a valid
//! configuration. [`EngineConfig::validate`] range-checks the result; the
//! engine calls it on construction.

use std::path::Path;

use exuvia_backend::RemoteConfig;
use exuvia_kernel::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_CANDIDATES, DEFAULT_DECAY, DEFAULT_MAX_ITERATIONS,
    DEFAULT_REPETITIONS, DEFAULT_STEPS, DEFAULT_TOLERANCE, DEFAULT_UNIT_CAP, MAX_UNIT_CAP,
    OracleConfig,
};
use serde::Deserialize;

use crate::error::EngineError;

/// Environment variable that overrides `remote.endpoint`.
pub const REMOTE_ENDPOINT_ENV: &str = "EXUVIA_REMOTE_ENDPOINT";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
///
/// Mirrors the structure of `exuvia-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Encoder and kernel cache settings.
    #[serde(default)]
    pub kernel: KernelConfig,

    /// Sequence embedding settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Manifold navigation settings.
    #[serde(default)]
    pub navigation: NavigationConfig,

    /// Propagation gating.
    #[serde(default)]
    pub propagation: PropagationConfig,

    /// Fixed-point oracle settings.
    #[serde(default)]
    pub oracle: OracleSettings,

    /// Optional remote kernel service. Absent means local only.
    #[serde(default)]
    pub remote: Option<RemoteConfig>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `EXUVIA_REMOTE_ENDPOINT` overrides `remote.endpoint`, creating the
    /// `remote` section if the file has none.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, applying env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup, e.g. a map in tests.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = lookup(REMOTE_ENDPOINT_ENV) {
            match &mut self.remote {
                Some(remote) => remote.endpoint = endpoint,
                None => self.remote = Some(RemoteConfig::new(endpoint)),
            }
        }
    }

    /// Range-check every value.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfiguration`] naming the first bad value.
    pub fn validate(&self) -> Result<(), EngineError> {
        let k = &self.kernel;
        if k.unit_cap == 0 || k.unit_cap > MAX_UNIT_CAP {
            return Err(EngineError::invalid_config(format!(
                "kernel.unit_cap {} must be in 1..={MAX_UNIT_CAP}",
                k.unit_cap
            )));
        }
        if k.repetitions == 0 {
            return Err(EngineError::invalid_config("kernel.repetitions must be at least 1"));
        }
        if k.cache_capacity == 0 {
            return Err(EngineError::invalid_config("kernel.cache_capacity must be at least 1"));
        }

        let e = &self.embedding;
        if e.dimension == 0 || e.dimension > k.unit_cap {
            return Err(EngineError::invalid_config(format!(
                "embedding.dimension {} must be in 1..={}",
                e.dimension, k.unit_cap
            )));
        }
        if !(e.decay > 0.0 && e.decay <= 1.0) {
            return Err(EngineError::invalid_config(format!(
                "embedding.decay {} must be in (0, 1]",
                e.decay
            )));
        }
        if e.max_history == 0 {
            return Err(EngineError::invalid_config("embedding.max_history must be at least 1"));
        }

        if self.navigation.steps == 0 {
            return Err(EngineError::invalid_config("navigation.steps must be at least 1"));
        }

        let t = self.propagation.threshold;
        if !(0.0..=1.0).contains(&t) {
            return Err(EngineError::invalid_config(format!(
                "propagation.threshold {t} must be in [0, 1]"
            )));
        }

        let o = &self.oracle;
        if o.max_iterations == 0 {
            return Err(EngineError::invalid_config("oracle.max_iterations must be at least 1"));
        }
        if !(o.tolerance.is_finite() && o.tolerance > 0.0) {
            return Err(EngineError::invalid_config(format!(
                "oracle.tolerance {} must be positive",
                o.tolerance
            )));
        }
        if o.candidates == 0 {
            return Err(EngineError::invalid_config("oracle.candidates must be at least 1"));
        }

        if let Some(remote) = &self.remote {
            if remote.endpoint.trim().is_empty() {
                return Err(EngineError::invalid_config("remote.endpoint must not be empty"));
            }
            if remote.timeout_ms == 0 {
                return Err(EngineError::invalid_config("remote.timeout_ms must be at least 1"));
            }
        }

        Ok(())
    }
}

/// Encoder and kernel cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KernelConfig {
    /// Maximum number of simulated units (feature length cap).
    #[serde(default = "default_unit_cap")]
    pub unit_cap: usize,

    /// Encoding repetitions.
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,

    /// Kernel memo capacity, in entries.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            unit_cap: default_unit_cap(),
            repetitions: default_repetitions(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

/// Sequence embedding configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmbeddingConfig {
    /// Length of every entity embedding.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Exponential decay per step back in history.
    #[serde(default = "default_decay")]
    pub decay: f64,

    /// History entries kept per entity; oldest are dropped first.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
            decay: default_decay(),
            max_history: default_max_history(),
        }
    }
}

/// Manifold navigation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NavigationConfig {
    /// Softmax re-embedding steps per navigation.
    #[serde(default = "default_steps")]
    pub steps: usize,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            steps: default_steps(),
        }
    }
}

/// Propagation configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PropagationConfig {
    /// Kernel values strictly above this are accepted.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

/// Fixed-point oracle configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OracleSettings {
    /// Iteration budget.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Convergence tolerance on the similarity change.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Candidate space size.
    #[serde(default = "default_candidates")]
    pub candidates: usize,
}

impl OracleSettings {
    /// The kernel crate's view of these settings.
    pub const fn oracle_config(&self) -> OracleConfig {
        OracleConfig {
            tolerance: self.tolerance,
            candidates: self.candidates,
        }
    }
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            candidates: default_candidates(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). Consumed by whichever
    /// binary installs the subscriber.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

const fn default_unit_cap() -> usize {
    DEFAULT_UNIT_CAP
}

const fn default_repetitions() -> u32 {
    DEFAULT_REPETITIONS
}

const fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

const fn default_dimension() -> usize {
    10
}

const fn default_decay() -> f64 {
    DEFAULT_DECAY
}

const fn default_max_history() -> usize {
    64
}

const fn default_steps() -> usize {
    DEFAULT_STEPS
}

const fn default_threshold() -> f64 {
    0.7
}

const fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

const fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

const fn default_candidates() -> usize {
    DEFAULT_CANDIDATES
}

fn default_log_level() -> String {
    "info".to_owned()
}
