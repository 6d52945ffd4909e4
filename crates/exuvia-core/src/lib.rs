//! Entity lifecycle engine for Exuvia.
//!
//! [`LifecycleEngine`] spawns entities from opaque identity bytes, folds
//! observations into their embeddings, molts their fingerprints under a
//! closed set of tenets, and propagates state between entities whose kernel
//! similarity clears a threshold. Every outcome is reported to an
//! [`EventSink`](exuvia_events::EventSink).
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `exuvia-config.yaml`
//! - [`engine`] -- The lifecycle state machine and its operations
//! - [`error`] -- [`EngineError`]
//! - [`fingerprint`] -- SHA-256 spawn and molt digests

pub mod config;
pub mod engine;
mod entity;
pub mod error;
pub mod fingerprint;

pub use config::{ConfigError, EngineConfig, REMOTE_ENDPOINT_ENV};
pub use engine::{LifecycleEngine, MoltOutcome, NavigateOutcome, PropagateOutcome, SpawnRequest};
pub use error::EngineError;
