//! Shared type definitions for the Exuvia lifecycle engine.
//!
//! This crate is the single source of truth for values that cross crate
//! boundaries. Types flow downstream to `TypeScript` via `ts-rs` for
//! observability collaborators.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for entity and event identifiers
//! - [`enums`] -- Lifecycle phases, tenets, anchors, backend and event kinds
//! - [`structs`] -- Fingerprints, anchor distributions, propagation edges, status views

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{Anchor, BackendKind, EventKind, LifecycleStatus, Tenet, UnknownTenet};
pub use ids::{EntityId, EventId};
pub use structs::{
    AnchorDistribution, BackendInfo, EntityStatus, FeatureVector, Fingerprint, PropagationEdge,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs writes bindings for types marked #[ts(export)] into the
        // `bindings/` directory relative to the crate root.
        use ts_rs::TS;

        let _ = crate::ids::EntityId::export_all();
        let _ = crate::ids::EventId::export_all();

        let _ = crate::enums::LifecycleStatus::export_all();
        let _ = crate::enums::Tenet::export_all();
        let _ = crate::enums::Anchor::export_all();
        let _ = crate::enums::BackendKind::export_all();
        let _ = crate::enums::EventKind::export_all();

        let _ = crate::structs::Fingerprint::export_all();
        let _ = crate::structs::AnchorDistribution::export_all();
        let _ = crate::structs::PropagationEdge::export_all();
        let _ = crate::structs::EntityStatus::export_all();
        let _ = crate::structs::BackendInfo::export_all();
    }
}
