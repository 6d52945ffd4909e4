//! Numerical core of the Exuvia lifecycle engine.
//!
//! Everything here is pure, CPU-only and bounded: no I/O, no global state.
//! The one piece of shared mutable state is the [`KernelEstimator`] cache,
//! which is internally synchronized.
//!
//! # Modules
//!
//! - [`encoder`] -- Feature vector to unit-norm complex state ([`Encoder`])
//! - [`kernel`] -- Squared-overlap similarity and its LRU memo ([`KernelEstimator`])
//! - [`embed`] -- Recency-decayed sequence embedding ([`SequenceEmbedder`])
//! - [`navigator`] -- Softmax projection onto the three anchors ([`navigate`])
//! - [`oracle`] -- Bounded fixed-point search ([`RetrocausalOracle`])
//! - [`error`] -- Error type for all of the above ([`KernelError`])

pub mod embed;
pub mod encoder;
pub mod error;
pub mod kernel;
pub mod navigator;
pub mod oracle;

pub use embed::{DEFAULT_DECAY, SequenceEmbedder, embed};
pub use encoder::{
    DEFAULT_REPETITIONS, DEFAULT_UNIT_CAP, EncodedState, Encoder, MAX_UNIT_CAP, encode,
};
pub use error::{KernelError, ensure_dimension, ensure_finite};
pub use kernel::{CacheStats, DEFAULT_CACHE_CAPACITY, KernelEstimator, fidelity};
pub use navigator::{DEFAULT_STEPS, Navigation, navigate, softmax};
pub use oracle::{
    DEFAULT_CANDIDATES, DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE, FixedPoint, OracleConfig,
    RetrocausalOracle,
};
