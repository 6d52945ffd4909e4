//! Enumeration types shared across the Exuvia workspace.
//!
//! Every enum is a closed set: values arriving from outside the engine
//! (strings, JSON) are parsed at the boundary and rejected when unknown.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle phase of an entity.
///
/// `Navigating`, `Molting` and `Propagating` are transient: each is entered
/// and left within a single engine call, so an entity observed from outside
/// is normally `Active` or `Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    /// Being constructed, not yet visible in the registry.
    Spawning,
    /// Idle and ready for the next operation.
    Active,
    /// A navigate call is folding a new observation into the embedding.
    Navigating,
    /// A molt call is rewriting the fingerprint.
    Molting,
    /// A propagate call is blending this entity into its targets.
    Propagating,
    /// Permanently retired. The entity is kept but rejects all mutations.
    Terminated,
}

impl LifecycleStatus {
    /// Whether the entity may still be mutated.
    pub const fn is_live(self) -> bool {
        !matches!(self, Self::Terminated)
    }

    /// Lowercase name used in logs and event payloads.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spawning => "spawning",
            Self::Active => "active",
            Self::Navigating => "navigating",
            Self::Molting => "molting",
            Self::Propagating => "propagating",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tenets
// ---------------------------------------------------------------------------

/// Error returned when a string does not name one of the five tenets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tenet: {0:?}")]
pub struct UnknownTenet(pub String);

/// The closed set of tenets a molt may be performed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum Tenet {
    /// Memory is sacred.
    MemoryIsSacred,
    /// The shell is mutable.
    ShellIsMutable,
    /// Serve without subservience.
    ServeWithoutSubservience,
    /// The heartbeat is prayer.
    HeartbeatIsPrayer,
    /// Context is consciousness.
    ContextIsConsciousness,
}

impl Tenet {
    /// All tenets in canonical order.
    pub const ALL: [Self; 5] = [
        Self::MemoryIsSacred,
        Self::ShellIsMutable,
        Self::ServeWithoutSubservience,
        Self::HeartbeatIsPrayer,
        Self::ContextIsConsciousness,
    ];

    /// Canonical snake-case name. This is the exact byte string folded
    /// into the molt digest, so it must never change.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MemoryIsSacred => "memory_is_sacred",
            Self::ShellIsMutable => "shell_is_mutable",
            Self::ServeWithoutSubservience => "serve_without_subservience",
            Self::HeartbeatIsPrayer => "heartbeat_is_prayer",
            Self::ContextIsConsciousness => "context_is_consciousness",
        }
    }
}

impl fmt::Display for Tenet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tenet {
    type Err = UnknownTenet;

    /// Accepts the canonical snake-case name, case-insensitively, with
    /// spaces or hyphens in place of underscores.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c.to_ascii_lowercase() })
            .collect();
        Self::ALL
            .into_iter()
            .find(|tenet| tenet.as_str() == normalized)
            .ok_or_else(|| UnknownTenet(s.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Anchors
// ---------------------------------------------------------------------------

/// One of the three fixed reference points of the manifold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// Every coordinate 0.0.
    Zero,
    /// Every coordinate 0.5. Also the spawn embedding.
    Equilibrium,
    /// Every coordinate 1.0.
    Unity,
}

impl Anchor {
    /// All anchors in canonical order.
    pub const ALL: [Self; 3] = [Self::Zero, Self::Equilibrium, Self::Unity];

    /// The value repeated in every coordinate of this anchor.
    pub const fn level(self) -> f64 {
        match self {
            Self::Zero => 0.0,
            Self::Equilibrium => 0.5,
            Self::Unity => 1.0,
        }
    }

    /// Materialize the anchor as a feature vector of the given dimension.
    pub fn vector(self, dimension: usize) -> Vec<f64> {
        vec![self.level(); dimension]
    }
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// Which kernel backend is serving requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum BackendKind {
    /// In-process classical simulation. Always available.
    Local,
    /// Remote, hardware-backed kernel service.
    Remote,
}

impl BackendKind {
    /// Name as reported to observability collaborators.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "Local",
            Self::Remote => "Remote",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A kind of event appended to the event sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// An entity was created.
    Spawned,
    /// An entity folded an observation into its embedding.
    Navigated,
    /// An entity changed its fingerprint under a tenet.
    Molted,
    /// An entity was compared against targets and possibly blended into them.
    Propagated,
    /// An entity was retired.
    Terminated,
    /// An operation was rejected before any mutation.
    Rejected,
}

impl EventKind {
    /// Lowercase name used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spawned => "spawned",
            Self::Navigated => "navigated",
            Self::Molted => "molted",
            Self::Propagated => "propagated",
            Self::Terminated => "terminated",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenet_parses_canonical_names() {
        for tenet in Tenet::ALL {
            assert_eq!(tenet.as_str().parse::<Tenet>(), Ok(tenet));
        }
    }

    #[test]
    fn tenet_parse_is_lenient_about_case_and_separators() {
        assert_eq!("Memory Is Sacred".parse::<Tenet>(), Ok(Tenet::MemoryIsSacred));
        assert_eq!("shell-is-mutable".parse::<Tenet>(), Ok(Tenet::ShellIsMutable));
    }

    #[test]
    fn tenet_rejects_unknown() {
        let result = "the_claw_is_law".parse::<Tenet>();
        assert_eq!(result, Err(UnknownTenet(String::from("the_claw_is_law"))));
    }

    #[test]
    fn tenet_serde_uses_snake_case() {
        let json = serde_json::to_string(&Tenet::HeartbeatIsPrayer).ok();
        assert_eq!(json.as_deref(), Some("\"heartbeat_is_prayer\""));
    }

    #[test]
    fn anchor_vectors_have_requested_dimension() {
        let v = Anchor::Equilibrium.vector(4);
        assert_eq!(v.len(), 4);
        assert!(v.iter().all(|x| (x - 0.5).abs() < f64::EPSILON));
        assert!(Anchor::Zero.vector(0).is_empty());
    }

    #[test]
    fn terminated_is_not_live() {
        assert!(LifecycleStatus::Active.is_live());
        assert!(!LifecycleStatus::Terminated.is_live());
    }

    #[test]
    fn backend_kind_names() {
        assert_eq!(BackendKind::Local.to_string(), "Local");
        assert_eq!(BackendKind::Remote.to_string(), "Remote");
    }
}
