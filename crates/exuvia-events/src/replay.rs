//! Rebuild entity state from an event stream.
//!
//! A [`Projection`] folds [`LifecycleEvent`]s in order and tracks, per
//! entity, everything the engine exposes through `status`: fingerprint,
//! molt counter, lifecycle status, embedding and last anchor distribution.
//! Replaying the full log of a run must land on the engine's final state.

use std::collections::BTreeMap;

use exuvia_types::{AnchorDistribution, EntityId, EventKind, Fingerprint, LifecycleStatus};

use crate::payload::{
    MoltedDetails, NavigatedDetails, PropagatedDetails, SpawnedDetails, TerminatedDetails,
};
use crate::sink::LifecycleEvent;

/// Failures while folding an event stream.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// An event's details did not match the schema for its kind.
    #[error("malformed {kind} event details: {source}")]
    Payload {
        /// Kind of the offending event.
        kind: EventKind,
        /// The underlying deserialization error.
        source: serde_json::Error,
    },

    /// An event referenced an entity with no prior `Spawned` event.
    #[error("event references unknown entity {0}")]
    UnknownEntity(EntityId),

    /// A `Spawned` event reused an existing entity id.
    #[error("entity {0} spawned twice")]
    DuplicateSpawn(EntityId),
}

/// Replayed view of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedEntity {
    /// Label given at spawn.
    pub label: String,
    /// Current fingerprint.
    pub fingerprint: Fingerprint,
    /// Number of molts.
    pub molt_count: u64,
    /// Lifecycle status between operations.
    pub status: LifecycleStatus,
    /// Current embedding.
    pub embedding: Vec<f64>,
    /// Distribution from the most recent navigation.
    pub last_anchor_distribution: Option<AnchorDistribution>,
}

/// Entity states reconstructed from events.
#[derive(Debug, Clone, Default)]
pub struct Projection {
    entities: BTreeMap<EntityId, ProjectedEntity>,
    applied: usize,
}

impl Projection {
    /// Create an empty projection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a whole stream, in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`ReplayError`] encountered.
    pub fn replay<'a, I>(events: I) -> Result<Self, ReplayError>
    where
        I: IntoIterator<Item = &'a LifecycleEvent>,
    {
        let mut projection = Self::new();
        for event in events {
            projection.apply(event)?;
        }
        Ok(projection)
    }

    /// Fold one event.
    ///
    /// `Rejected` events are counted but change nothing, since rejected
    /// operations never mutate state.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError`] for malformed details or references to
    /// unknown entities.
    pub fn apply(&mut self, event: &LifecycleEvent) -> Result<(), ReplayError> {
        match event.kind {
            EventKind::Spawned => {
                let d: SpawnedDetails = details(event)?;
                if self.entities.contains_key(&d.entity_id) {
                    return Err(ReplayError::DuplicateSpawn(d.entity_id));
                }
                self.entities.insert(
                    d.entity_id,
                    ProjectedEntity {
                        label: d.label,
                        fingerprint: d.fingerprint,
                        molt_count: 0,
                        status: LifecycleStatus::Active,
                        embedding: d.embedding,
                        last_anchor_distribution: None,
                    },
                );
            }
            EventKind::Navigated => {
                let d: NavigatedDetails = details(event)?;
                let entity = self.entity_mut(d.entity_id)?;
                entity.embedding = d.new_embedding;
                entity.last_anchor_distribution = Some(d.distribution);
            }
            EventKind::Molted => {
                let d: MoltedDetails = details(event)?;
                let entity = self.entity_mut(d.entity_id)?;
                entity.fingerprint = d.new_fingerprint;
                entity.molt_count = d.molt_count;
            }
            EventKind::Propagated => {
                let d: PropagatedDetails = details(event)?;
                self.entity_mut(d.source)?;
                for update in d.updates {
                    self.entity_mut(update.target)?.embedding = update.new_embedding;
                }
            }
            EventKind::Terminated => {
                let d: TerminatedDetails = details(event)?;
                self.entity_mut(d.entity_id)?.status = LifecycleStatus::Terminated;
            }
            EventKind::Rejected => {}
        }
        self.applied = self.applied.saturating_add(1);
        Ok(())
    }

    /// Replayed state of one entity.
    pub fn get(&self, id: EntityId) -> Option<&ProjectedEntity> {
        self.entities.get(&id)
    }

    /// All replayed entities, ordered by id.
    pub fn entities(&self) -> impl Iterator<Item = (&EntityId, &ProjectedEntity)> {
        self.entities.iter()
    }

    /// Number of entities seen.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether no entity has been seen.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of events folded.
    pub const fn applied(&self) -> usize {
        self.applied
    }

    fn entity_mut(&mut self, id: EntityId) -> Result<&mut ProjectedEntity, ReplayError> {
        self.entities
            .get_mut(&id)
            .ok_or(ReplayError::UnknownEntity(id))
    }
}

fn details<T: serde::de::DeserializeOwned>(event: &LifecycleEvent) -> Result<T, ReplayError> {
    serde_json::from_value(event.details.clone()).map_err(|source| ReplayError::Payload {
        kind: event.kind,
        source,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use chrono::Utc;
    use exuvia_types::Tenet;

    use super::*;

    fn spawned(id: EntityId) -> LifecycleEvent {
        let d = SpawnedDetails {
            entity_id: id,
            label: String::from("alpha"),
            fingerprint: Fingerprint(String::from("aa")),
            embedding: vec![0.5, 0.5],
            created_at: Utc::now(),
        };
        LifecycleEvent::new(EventKind::Spawned, serde_json::to_value(d).unwrap())
    }

    #[test]
    fn molt_then_terminate_is_reconstructed() {
        let id = EntityId::new();
        let molt = MoltedDetails {
            entity_id: id,
            tenet: Tenet::ShellIsMutable,
            old_fingerprint: Fingerprint(String::from("aa")),
            new_fingerprint: Fingerprint(String::from("bb")),
            molt_count: 1,
        };
        let term = TerminatedDetails {
            entity_id: id,
            fingerprint: Fingerprint(String::from("bb")),
        };
        let events = vec![
            spawned(id),
            LifecycleEvent::new(EventKind::Molted, serde_json::to_value(molt).unwrap()),
            LifecycleEvent::new(EventKind::Rejected, serde_json::json!({})),
            LifecycleEvent::new(EventKind::Terminated, serde_json::to_value(term).unwrap()),
        ];

        let projection = Projection::replay(&events).unwrap();
        let entity = projection.get(id).unwrap();
        assert_eq!(entity.fingerprint.as_str(), "bb");
        assert_eq!(entity.molt_count, 1);
        assert_eq!(entity.status, LifecycleStatus::Terminated);
        assert_eq!(projection.applied(), 4);
    }

    #[test]
    fn unknown_entity_is_an_error() {
        let term = TerminatedDetails {
            entity_id: EntityId::new(),
            fingerprint: Fingerprint(String::from("00")),
        };
        let event = LifecycleEvent::new(EventKind::Terminated, serde_json::to_value(term).unwrap());
        let result = Projection::new().apply(&event);
        assert!(matches!(result, Err(ReplayError::UnknownEntity(_))));
    }

    #[test]
    fn malformed_details_are_an_error() {
        let event = LifecycleEvent::new(EventKind::Molted, serde_json::json!({"nope": 1}));
        let result = Projection::new().apply(&event);
        assert!(matches!(result, Err(ReplayError::Payload { .. })));
    }

    #[test]
    fn duplicate_spawn_is_an_error() {
        let id = EntityId::new();
        let events = vec![spawned(id), spawned(id)];
        assert!(matches!(
            Projection::replay(&events),
            Err(ReplayError::DuplicateSpawn(_))
        ));
    }
}
