//! The mutable entity aggregate and its registry.
//!
//! Entities are only ever touched through an [`EntityHandle`]. The registry
//! lock is held just long enough to clone a handle or insert new ones; all
//! mutation happens under the entity's own async mutex.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use exuvia_types::{AnchorDistribution, EntityId, EntityStatus, Fingerprint, LifecycleStatus};
use parking_lot::RwLock;

use crate::error::EngineError;

/// Shared, individually locked entity.
pub(crate) type EntityHandle = Arc<tokio::sync::Mutex<Entity>>;

#[derive(Debug, Clone)]
pub(crate) struct Entity {
    pub id: EntityId,
    pub label: String,
    pub fingerprint: Fingerprint,
    pub status: LifecycleStatus,
    pub embedding: Vec<f64>,
    pub history: VecDeque<Vec<f64>>,
    pub max_history: usize,
    pub molt_count: u64,
    pub last_anchor_distribution: Option<AnchorDistribution>,
    pub created_at: DateTime<Utc>,
}

impl Entity {
    pub const fn ensure_live(&self) -> Result<(), EngineError> {
        if self.status.is_live() {
            Ok(())
        } else {
            Err(EngineError::EntityTerminated { id: self.id })
        }
    }

    /// History with `entry` appended and the oldest entries dropped past the bound.
    pub fn history_with(&self, entry: Vec<f64>) -> VecDeque<Vec<f64>> {
        let mut history = self.history.clone();
        history.push_back(entry);
        while history.len() > self.max_history {
            history.pop_front();
        }
        history
    }

    pub fn status_view(&self) -> EntityStatus {
        EntityStatus {
            id: self.id,
            label: self.label.clone(),
            fingerprint: self.fingerprint.clone(),
            molt_count: self.molt_count,
            lifecycle_status: self.status,
            embedding: self.embedding.clone(),
            history_len: self.history.len(),
            last_anchor_distribution: self.last_anchor_distribution,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Registry {
    entities: RwLock<BTreeMap<EntityId, EntityHandle>>,
}

impl Registry {
    pub fn get(&self, id: EntityId) -> Result<EntityHandle, EngineError> {
        self.entities
            .read()
            .get(&id)
            .map(Arc::clone)
            .ok_or(EngineError::UnknownEntity { id })
    }

    pub fn insert_all(&self, entities: impl IntoIterator<Item = Entity>) {
        let mut map = self.entities.write();
        for entity in entities {
            map.insert(entity.id, Arc::new(tokio::sync::Mutex::new(entity)));
        }
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entities.read().len()
    }
}
