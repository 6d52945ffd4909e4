//! Typed event details.
//!
//! Sinks receive details as `serde_json::Value` so that the trait stays
//! object-safe and storage-agnostic. These structs are the schema on both
//! sides: the engine serializes them, [`Projection`](crate::Projection)
//! deserializes them.

use chrono::{DateTime, Utc};
use exuvia_types::{AnchorDistribution, EntityId, Fingerprint, PropagationEdge, Tenet};
use serde::{Deserialize, Serialize};

/// Details of an [`EventKind::Spawned`](exuvia_types::EventKind::Spawned) event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnedDetails {
    /// The new entity.
    pub entity_id: EntityId,
    /// Caller-supplied label.
    pub label: String,
    /// Initial fingerprint.
    pub fingerprint: Fingerprint,
    /// Initial embedding.
    pub embedding: Vec<f64>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Details of an [`EventKind::Navigated`](exuvia_types::EventKind::Navigated) event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigatedDetails {
    /// The navigating entity.
    pub entity_id: EntityId,
    /// Observation appended to the history.
    pub observation: Vec<f64>,
    /// Embedding before the observation.
    pub old_embedding: Vec<f64>,
    /// Embedding after the observation.
    pub new_embedding: Vec<f64>,
    /// Anchor distribution from the manifold walk.
    pub distribution: AnchorDistribution,
    /// Anchor-weighted blend reached by the last walk step. Empty in logs
    /// written before it was recorded.
    #[serde(default)]
    pub endpoint: Vec<f64>,
}

/// Details of an [`EventKind::Molted`](exuvia_types::EventKind::Molted) event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoltedDetails {
    /// The molting entity.
    pub entity_id: EntityId,
    /// Tenet applied.
    pub tenet: Tenet,
    /// Fingerprint before the molt.
    pub old_fingerprint: Fingerprint,
    /// Fingerprint after the molt.
    pub new_fingerprint: Fingerprint,
    /// Molt counter after the molt.
    pub molt_count: u64,
}

/// One target's embedding change inside a propagation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetUpdate {
    /// The blended target.
    pub target: EntityId,
    /// Embedding before blending.
    pub old_embedding: Vec<f64>,
    /// Embedding after blending.
    pub new_embedding: Vec<f64>,
}

/// Details of an [`EventKind::Propagated`](exuvia_types::EventKind::Propagated) event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropagatedDetails {
    /// The propagating entity.
    pub source: EntityId,
    /// One edge per requested target, accepted or not.
    pub edges: Vec<PropagationEdge>,
    /// Embedding changes for accepted targets only.
    pub updates: Vec<TargetUpdate>,
}

/// Details of an [`EventKind::Terminated`](exuvia_types::EventKind::Terminated) event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminatedDetails {
    /// The retired entity.
    pub entity_id: EntityId,
    /// Fingerprint at termination.
    pub fingerprint: Fingerprint,
}

/// Details of an [`EventKind::Rejected`](exuvia_types::EventKind::Rejected) event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedDetails {
    /// Operation name, e.g. `"molt"`.
    pub operation: String,
    /// Entity the operation targeted, when known.
    pub entity_id: Option<EntityId>,
    /// Machine-readable error class, e.g. `"unknown_entity"`.
    pub code: String,
    /// Rendered error.
    pub reason: String,
}
