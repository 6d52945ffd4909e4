//! Error types for the lifecycle engine.

use exuvia_kernel::KernelError;
use exuvia_types::{EntityId, UnknownTenet};

use crate::config::ConfigError;

/// Errors returned by [`LifecycleEngine`](crate::LifecycleEngine) operations.
///
/// Every error is raised before any entity is mutated.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Bad feature input or kernel configuration.
    #[error("kernel error: {source}")]
    Kernel {
        /// The underlying kernel error.
        #[from]
        source: KernelError,
    },

    /// A tenet name outside the closed set.
    #[error("invalid tenet: {value:?}")]
    InvalidTenet {
        /// The rejected input.
        value: String,
    },

    /// No entity is registered under this id.
    #[error("unknown entity {id}")]
    UnknownEntity {
        /// The missing id.
        id: EntityId,
    },

    /// The entity has been terminated and accepts no further mutation.
    #[error("entity {id} is terminated")]
    EntityTerminated {
        /// The terminated entity.
        id: EntityId,
    },

    /// An entity was listed among its own propagation targets.
    #[error("entity {id} cannot propagate to itself")]
    SelfPropagation {
        /// The offending entity.
        id: EntityId,
    },

    /// The molt counter is already at its maximum.
    #[error("entity {id} cannot molt again: molt counter exhausted")]
    MoltLimitReached {
        /// The entity whose counter is full.
        id: EntityId,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Which value and why.
        reason: String,
    },

    /// The configuration file could not be loaded.
    #[error("configuration error: {source}")]
    Config {
        /// The underlying load error.
        #[from]
        source: ConfigError,
    },
}

impl From<UnknownTenet> for EngineError {
    fn from(err: UnknownTenet) -> Self {
        Self::InvalidTenet { value: err.0 }
    }
}

impl EngineError {
    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    /// Short operation-independent label used in rejection events.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Kernel { .. } => "invalid_input",
            Self::InvalidTenet { .. } => "invalid_tenet",
            Self::UnknownEntity { .. } => "unknown_entity",
            Self::EntityTerminated { .. } => "entity_terminated",
            Self::SelfPropagation { .. } => "self_propagation",
            Self::MoltLimitReached { .. } => "molt_limit_reached",
            Self::InvalidConfiguration { .. } => "invalid_configuration",
            Self::Config { .. } => "config",
        }
    }
}
