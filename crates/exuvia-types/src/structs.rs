//! Core data structures exchanged between the engine and its collaborators.
//!
//! Everything here is a plain value: read-only snapshots of engine-owned
//! state, or records handed to the event sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Anchor, BackendKind, LifecycleStatus};
use crate::ids::EntityId;

/// A real-valued feature vector. Length is bounded by the simulated-unit cap.
pub type FeatureVector = Vec<f64>;

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

/// Lowercase hex SHA-256 digest identifying an entity's current identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Fingerprint(pub String);

impl Fingerprint {
    /// Borrow the hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Anchor distribution
// ---------------------------------------------------------------------------

/// Softmax probability mass over the three manifold anchors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AnchorDistribution {
    /// Mass on [`Anchor::Zero`].
    pub zero: f64,
    /// Mass on [`Anchor::Equilibrium`].
    pub equilibrium: f64,
    /// Mass on [`Anchor::Unity`].
    pub unity: f64,
}

impl AnchorDistribution {
    /// Build from weights listed in [`Anchor::ALL`] order.
    pub const fn from_weights(weights: [f64; 3]) -> Self {
        let [zero, equilibrium, unity] = weights;
        Self {
            zero,
            equilibrium,
            unity,
        }
    }

    /// Uniform mass over all three anchors.
    pub const fn uniform() -> Self {
        let third = 1.0 / 3.0;
        Self::from_weights([third, third, third])
    }

    /// Weights in [`Anchor::ALL`] order.
    pub const fn weights(&self) -> [f64; 3] {
        [self.zero, self.equilibrium, self.unity]
    }

    /// Probability of the given anchor.
    pub const fn probability(&self, anchor: Anchor) -> f64 {
        match anchor {
            Anchor::Zero => self.zero,
            Anchor::Equilibrium => self.equilibrium,
            Anchor::Unity => self.unity,
        }
    }

    /// The anchor carrying the most mass. Ties resolve to the earlier anchor.
    pub fn dominant(&self) -> Anchor {
        let mut best = Anchor::Zero;
        for anchor in Anchor::ALL {
            if self.probability(anchor) > self.probability(best) {
                best = anchor;
            }
        }
        best
    }
}

// ---------------------------------------------------------------------------
// Propagation
// ---------------------------------------------------------------------------

/// Outcome of comparing a source entity with one target during propagation.
///
/// Ephemeral: returned to the caller and handed to the event sink, never
/// retained by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PropagationEdge {
    /// Entity whose state was offered.
    pub source: EntityId,
    /// Entity that may have absorbed it.
    pub target: EntityId,
    /// Kernel similarity between the two embeddings.
    pub kernel_value: f64,
    /// Whether the similarity cleared the threshold and the target blended.
    pub accepted: bool,
}

// ---------------------------------------------------------------------------
// Status views
// ---------------------------------------------------------------------------

/// Read-only snapshot of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EntityStatus {
    /// Entity identifier.
    pub id: EntityId,
    /// Label supplied at spawn.
    pub label: String,
    /// Current fingerprint.
    pub fingerprint: Fingerprint,
    /// Number of completed molts.
    pub molt_count: u64,
    /// Current lifecycle phase.
    pub lifecycle_status: LifecycleStatus,
    /// Current sequence embedding.
    pub embedding: Vec<f64>,
    /// Number of observations held in the decayed history.
    pub history_len: usize,
    /// Distribution produced by the most recent navigation, if any.
    pub last_anchor_distribution: Option<AnchorDistribution>,
    /// When the entity was spawned.
    pub created_at: DateTime<Utc>,
}

/// Which backend is serving kernel requests, for observability collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BackendInfo {
    /// Active backend kind.
    pub active: BackendKind,
    /// Human-readable backend name.
    pub name: String,
}
