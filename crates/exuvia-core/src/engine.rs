//! The entity lifecycle engine.
//!
//! [`LifecycleEngine`] owns every entity and drives the state machine:
//!
//! ```text
//! spawning -> active -> {navigating, molting, propagating} -> active -> ... -> terminated
//! ```
//!
//! Each operation runs in three stages: validate (no mutation), compute on
//! copies, commit. A failure in the first two stages leaves every entity
//! untouched and is reported to the event sink as a `Rejected` event. A
//! successful commit emits exactly one event while the affected entity
//! locks are still held, so per-entity event order matches mutation order.
//!
//! Locking: the registry's read-write lock is held only to look up or
//! insert handles. Navigate, Molt and Terminate lock one entity. Propagate
//! locks the source and all targets in ascending [`EntityId`] order, which
//! rules out deadlock between concurrent propagations in opposite directions.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use exuvia_backend::BackendSelector;
use exuvia_events::{
    EventSink, MoltedDetails, NavigatedDetails, PropagatedDetails, RejectedDetails,
    SpawnedDetails, TargetUpdate, TerminatedDetails,
};
use exuvia_kernel::{
    CacheStats, Encoder, FixedPoint, KernelEstimator, Navigation, RetrocausalOracle,
    SequenceEmbedder, ensure_dimension, ensure_finite, navigate,
};
use exuvia_types::{
    Anchor, AnchorDistribution, BackendInfo, EntityId, EntityStatus, EventKind, Fingerprint,
    LifecycleStatus, PropagationEdge, Tenet,
};
use rayon::prelude::*;
use serde::Serialize;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::entity::{Entity, Registry};
use crate::error::EngineError;
use crate::fingerprint::{molt_fingerprint, spawn_fingerprint};

/// One entry of a [`LifecycleEngine::spawn_batch`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    /// Label stored on the entity.
    pub label: String,
    /// Opaque identity bytes; only hashed.
    pub identity: Vec<u8>,
}

impl SpawnRequest {
    /// Build a request.
    pub fn new(label: impl Into<String>, identity: impl Into<Vec<u8>>) -> Self {
        Self {
            label: label.into(),
            identity: identity.into(),
        }
    }
}

/// Result of [`LifecycleEngine::navigate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigateOutcome {
    /// Embedding before the observation.
    pub old_embedding: Vec<f64>,
    /// Embedding after the observation.
    pub new_embedding: Vec<f64>,
    /// Anchor distribution of the new embedding.
    pub distribution: AnchorDistribution,
    /// Anchor-weighted blend reached by the final navigation step.
    pub endpoint: Vec<f64>,
}

/// Result of [`LifecycleEngine::molt`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoltOutcome {
    /// Fingerprint before the molt.
    pub old_fingerprint: Fingerprint,
    /// Fingerprint after the molt.
    pub new_fingerprint: Fingerprint,
    /// Molt counter after the molt.
    pub molt_count: u64,
}

/// Result of [`LifecycleEngine::propagate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropagateOutcome {
    /// One edge per distinct target, in request order.
    pub edges: Vec<PropagationEdge>,
    /// Target snapshots after the operation, in the same order.
    pub targets: Vec<EntityStatus>,
}

/// Owns all entities and orchestrates their lifecycle.
pub struct LifecycleEngine {
    config: EngineConfig,
    selector: BackendSelector,
    embedder: SequenceEmbedder,
    registry: Registry,
    sink: Arc<dyn EventSink>,
}

impl LifecycleEngine {
    /// Build an engine from a configuration.
    ///
    /// No network traffic happens here; a configured remote backend is
    /// probed on the first propagation or [`backend_info`](Self::backend_info) call.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfiguration`] if the configuration
    /// fails validation.
    pub fn new(config: EngineConfig, sink: Arc<dyn EventSink>) -> Result<Self, EngineError> {
        config.validate()?;
        let encoder = Encoder::new(config.kernel.unit_cap, config.kernel.repetitions)?;
        let estimator = Arc::new(KernelEstimator::new(encoder, config.kernel.cache_capacity)?);
        let embedder = SequenceEmbedder::new(config.embedding.decay, config.embedding.dimension)?;
        let selector = BackendSelector::new(estimator, config.remote.clone());

        info!(
            dimension = config.embedding.dimension,
            threshold = config.propagation.threshold,
            remote = config.remote.is_some(),
            "Lifecycle engine initialized"
        );

        Ok(Self {
            config,
            selector,
            embedder,
            registry: Registry::default(),
            sink,
        })
    }

    /// Load `path` with [`EngineConfig::from_file`] and build an engine from it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if the file cannot be read or parsed,
    /// and the errors of [`new`](Self::new) otherwise.
    pub fn from_config_file(path: &Path, sink: Arc<dyn EventSink>) -> Result<Self, EngineError> {
        let config = EngineConfig::from_file(path)?;
        Self::new(config, sink)
    }

    /// The validated configuration.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ids of every registered entity, live or terminated, in ascending order.
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.registry.ids()
    }

    /// Number of registered entities.
    pub fn entity_count(&self) -> usize {
        self.registry.len()
    }

    // -----------------------------------------------------------------------
    // Spawn
    // -----------------------------------------------------------------------

    /// Create an entity at the equilibrium embedding.
    ///
    /// The fingerprint depends only on `identity` and the configured
    /// dimension, so equal identities spawn equal fingerprints.
    pub fn spawn(&self, label: impl Into<String>, identity: &[u8]) -> EntityStatus {
        let entity = build_entity(label.into(), identity, &self.config);
        let status = entity.status_view();
        self.emit_spawned(&entity);
        self.registry.insert_all([entity]);
        info!(entity_id = %status.id, fingerprint = %status.fingerprint, "Entity spawned");
        status
    }

    /// Create many entities, building them in parallel.
    ///
    /// Entities become visible together once all are built. Results follow
    /// request order.
    pub fn spawn_batch(&self, requests: &[SpawnRequest]) -> Vec<EntityStatus> {
        let config = &self.config;
        let entities: Vec<Entity> = requests
            .par_iter()
            .map(|req| build_entity(req.label.clone(), &req.identity, config))
            .collect();

        let statuses: Vec<EntityStatus> = entities.iter().map(Entity::status_view).collect();
        for entity in &entities {
            self.emit_spawned(entity);
        }
        self.registry.insert_all(entities);
        info!(count = statuses.len(), "Entity batch spawned");
        statuses
    }

    // -----------------------------------------------------------------------
    // Navigate
    // -----------------------------------------------------------------------

    /// Fold an observation into the entity's history and re-project it onto
    /// the anchor manifold.
    ///
    /// # Errors
    ///
    /// - [`EngineError::UnknownEntity`] / [`EngineError::EntityTerminated`]
    /// - [`EngineError::Kernel`] if the observation has the wrong length or
    ///   non-finite values
    pub async fn navigate(
        &self,
        id: EntityId,
        observation: &[f64],
    ) -> Result<NavigateOutcome, EngineError> {
        self.try_navigate(id, observation)
            .await
            .map_err(|e| self.reject("navigate", Some(id), e))
    }

    async fn try_navigate(
        &self,
        id: EntityId,
        observation: &[f64],
    ) -> Result<NavigateOutcome, EngineError> {
        let handle = self.registry.get(id)?;
        let mut entity = handle.lock().await;
        entity.ensure_live()?;
        ensure_dimension(self.embedder.dimension(), observation.len())?;
        ensure_finite(observation)?;

        entity.status = LifecycleStatus::Navigating;
        let computed = self.compute_navigation(&entity, observation);
        entity.status = LifecycleStatus::Active;
        let (history, new_embedding, navigation) = computed?;
        let Navigation {
            distribution,
            endpoint,
        } = navigation;

        let old_embedding = std::mem::replace(&mut entity.embedding, new_embedding.clone());
        entity.history = history;
        entity.last_anchor_distribution = Some(distribution);

        self.emit(
            EventKind::Navigated,
            &NavigatedDetails {
                entity_id: id,
                observation: observation.to_vec(),
                old_embedding: old_embedding.clone(),
                new_embedding: new_embedding.clone(),
                distribution,
                endpoint: endpoint.clone(),
            },
        );
        info!(
            entity_id = %id,
            dominant = ?distribution.dominant(),
            history_len = entity.history.len(),
            "Entity navigated"
        );

        Ok(NavigateOutcome {
            old_embedding,
            new_embedding,
            distribution,
            endpoint,
        })
    }

    fn compute_navigation(
        &self,
        entity: &Entity,
        observation: &[f64],
    ) -> Result<(VecDeque<Vec<f64>>, Vec<f64>, Navigation), EngineError> {
        let mut history = entity.history_with(observation.to_vec());
        let embedding = self.embedder.embed(history.make_contiguous())?;
        let navigation = navigate(
            self.selector.estimator(),
            &embedding,
            self.config.navigation.steps,
        )?;
        debug!(
            entity_id = %entity.id,
            weights = ?navigation.distribution.weights(),
            "Manifold walk complete"
        );
        Ok((history, embedding, navigation))
    }

    // -----------------------------------------------------------------------
    // Molt
    // -----------------------------------------------------------------------

    /// Re-derive the entity's fingerprint under a tenet and bump its counter.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownEntity`], [`EngineError::EntityTerminated`], or
    /// [`EngineError::MoltLimitReached`] once the counter cannot grow.
    pub async fn molt(&self, id: EntityId, tenet: Tenet) -> Result<MoltOutcome, EngineError> {
        self.try_molt(id, tenet)
            .await
            .map_err(|e| self.reject("molt", Some(id), e))
    }

    /// [`molt`](Self::molt) with the tenet given by name.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidTenet`] if `tenet` names no tenet, plus the
    /// errors of [`molt`](Self::molt).
    pub async fn molt_named(&self, id: EntityId, tenet: &str) -> Result<MoltOutcome, EngineError> {
        match tenet.parse::<Tenet>() {
            Ok(tenet) => self.molt(id, tenet).await,
            Err(e) => Err(self.reject("molt", Some(id), e.into())),
        }
    }

    async fn try_molt(&self, id: EntityId, tenet: Tenet) -> Result<MoltOutcome, EngineError> {
        let handle = self.registry.get(id)?;
        let mut entity = handle.lock().await;
        entity.ensure_live()?;
        let Some(molt_count) = entity.molt_count.checked_add(1) else {
            return Err(EngineError::MoltLimitReached { id });
        };

        entity.status = LifecycleStatus::Molting;
        let new_fingerprint = molt_fingerprint(&entity.fingerprint, tenet, molt_count);
        let old_fingerprint = std::mem::replace(&mut entity.fingerprint, new_fingerprint.clone());
        entity.molt_count = molt_count;
        entity.status = LifecycleStatus::Active;

        self.emit(
            EventKind::Molted,
            &MoltedDetails {
                entity_id: id,
                tenet,
                old_fingerprint: old_fingerprint.clone(),
                new_fingerprint: new_fingerprint.clone(),
                molt_count,
            },
        );
        info!(entity_id = %id, tenet = tenet.as_str(), molt_count, "Entity molted");

        Ok(MoltOutcome {
            old_fingerprint,
            new_fingerprint,
            molt_count,
        })
    }

    // -----------------------------------------------------------------------
    // Propagate
    // -----------------------------------------------------------------------

    /// Compare the source against each target and blend it into every
    /// target whose kernel value exceeds the threshold.
    ///
    /// Duplicate targets are collapsed. The blend weight is
    /// `alpha = K * c_s / (c_s + c_t)` with `c = molt_count + 1`, so
    /// entities that have molted more resist being overwritten.
    ///
    /// # Errors
    ///
    /// - [`EngineError::SelfPropagation`] if `source` is among `targets`
    /// - [`EngineError::UnknownEntity`] / [`EngineError::EntityTerminated`]
    ///   for the source or any target
    pub async fn propagate(
        &self,
        source: EntityId,
        targets: &[EntityId],
    ) -> Result<PropagateOutcome, EngineError> {
        self.try_propagate(source, targets)
            .await
            .map_err(|e| self.reject("propagate", Some(source), e))
    }

    async fn try_propagate(
        &self,
        source: EntityId,
        targets: &[EntityId],
    ) -> Result<PropagateOutcome, EngineError> {
        if targets.contains(&source) {
            return Err(EngineError::SelfPropagation { id: source });
        }
        let mut seen = BTreeSet::new();
        let targets: Vec<EntityId> = targets.iter().copied().filter(|t| seen.insert(*t)).collect();

        // Resolve every handle before locking anything.
        let mut handles = BTreeMap::new();
        handles.insert(source, self.registry.get(source)?);
        for &target in &targets {
            handles.insert(target, self.registry.get(target)?);
        }

        // BTreeMap iteration is ascending by id: the global lock order.
        let mut guards: BTreeMap<EntityId, OwnedMutexGuard<Entity>> = BTreeMap::new();
        for (id, handle) in handles {
            guards.insert(id, handle.lock_owned().await);
        }
        for guard in guards.values() {
            guard.ensure_live()?;
        }

        let (source_embedding, source_strength) = match guards.get_mut(&source) {
            Some(entity) => {
                entity.status = LifecycleStatus::Propagating;
                (entity.embedding.clone(), crystallization(entity.molt_count))
            }
            None => return Err(EngineError::UnknownEntity { id: source }),
        };

        let computed = self
            .compute_propagation(source, &source_embedding, source_strength, &targets, &guards)
            .await;
        if let Some(entity) = guards.get_mut(&source) {
            entity.status = LifecycleStatus::Active;
        }
        let (edges, updates) = computed?;

        for update in &updates {
            if let Some(entity) = guards.get_mut(&update.target) {
                entity.history = entity.history_with(update.new_embedding.clone());
                entity.embedding.clone_from(&update.new_embedding);
            }
        }

        let target_views: Vec<EntityStatus> = targets
            .iter()
            .filter_map(|t| guards.get(t).map(|e| e.status_view()))
            .collect();

        let accepted = updates.len();
        self.emit(
            EventKind::Propagated,
            &PropagatedDetails {
                source,
                edges: edges.clone(),
                updates,
            },
        );
        info!(
            source = %source,
            targets = edges.len(),
            accepted,
            "Propagation complete"
        );

        Ok(PropagateOutcome {
            edges,
            targets: target_views,
        })
    }

    async fn compute_propagation(
        &self,
        source: EntityId,
        source_embedding: &[f64],
        source_strength: f64,
        targets: &[EntityId],
        guards: &BTreeMap<EntityId, OwnedMutexGuard<Entity>>,
    ) -> Result<(Vec<PropagationEdge>, Vec<TargetUpdate>), EngineError> {
        let threshold = self.config.propagation.threshold;
        let mut edges = Vec::with_capacity(targets.len());
        let mut updates = Vec::new();

        for &target in targets {
            let Some(entity) = guards.get(&target) else {
                return Err(EngineError::UnknownEntity { id: target });
            };
            let kernel_value = self
                .selector
                .execute_kernel(source_embedding, &entity.embedding)
                .await?;
            let accepted = kernel_value > threshold;
            debug!(%source, %target, kernel_value, accepted, "Propagation edge scored");

            if accepted {
                let target_strength = crystallization(entity.molt_count);
                let alpha = kernel_value * source_strength / (source_strength + target_strength);
                let new_embedding: Vec<f64> = entity
                    .embedding
                    .iter()
                    .zip(source_embedding)
                    .map(|(t, s)| (1.0 - alpha).mul_add(*t, alpha * s))
                    .collect();
                updates.push(TargetUpdate {
                    target,
                    old_embedding: entity.embedding.clone(),
                    new_embedding,
                });
            }

            edges.push(PropagationEdge {
                source,
                target,
                kernel_value,
                accepted,
            });
        }

        Ok((edges, updates))
    }

    // -----------------------------------------------------------------------
    // Terminate
    // -----------------------------------------------------------------------

    /// Retire an entity. It stays readable but rejects further mutation.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownEntity`], or [`EngineError::EntityTerminated`]
    /// if it was already terminated.
    pub async fn terminate(&self, id: EntityId) -> Result<EntityStatus, EngineError> {
        self.try_terminate(id)
            .await
            .map_err(|e| self.reject("terminate", Some(id), e))
    }

    async fn try_terminate(&self, id: EntityId) -> Result<EntityStatus, EngineError> {
        let handle = self.registry.get(id)?;
        let mut entity = handle.lock().await;
        entity.ensure_live()?;
        entity.status = LifecycleStatus::Terminated;

        self.emit(
            EventKind::Terminated,
            &TerminatedDetails {
                entity_id: id,
                fingerprint: entity.fingerprint.clone(),
            },
        );
        info!(entity_id = %id, molt_count = entity.molt_count, "Entity terminated");
        Ok(entity.status_view())
    }

    // -----------------------------------------------------------------------
    // Read-only operations
    // -----------------------------------------------------------------------

    /// Run the fixed-point oracle from the entity's current embedding.
    ///
    /// Read-only; works on terminated entities too.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownEntity`], or [`EngineError::Kernel`] if the
    /// oracle rejects its configuration.
    pub async fn find_fixed_point(&self, id: EntityId) -> Result<FixedPoint, EngineError> {
        let embedding = {
            let handle = self.registry.get(id)?;
            let entity = handle.lock().await;
            entity.embedding.clone()
        };
        let oracle =
            RetrocausalOracle::new(self.selector.estimator(), self.config.oracle.oracle_config())?;
        let fixed_point =
            oracle.find_fixed_point(&embedding, embedding.len(), self.config.oracle.max_iterations)?;
        debug!(
            entity_id = %id,
            iterations = fixed_point.iterations,
            converged = fixed_point.converged,
            "Fixed-point search finished"
        );
        Ok(fixed_point)
    }

    /// Snapshot of one entity.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownEntity`].
    pub async fn status(&self, id: EntityId) -> Result<EntityStatus, EngineError> {
        let handle = self.registry.get(id)?;
        let entity = handle.lock().await;
        Ok(entity.status_view())
    }

    /// Which backend is serving kernel requests. Resolves it on first call.
    pub async fn backend_info(&self) -> BackendInfo {
        self.selector.backend_info().await
    }

    /// Kernel memo statistics.
    pub fn kernel_stats(&self) -> CacheStats {
        self.selector.estimator().stats()
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    fn emit_spawned(&self, entity: &Entity) {
        self.emit(
            EventKind::Spawned,
            &SpawnedDetails {
                entity_id: entity.id,
                label: entity.label.clone(),
                fingerprint: entity.fingerprint.clone(),
                embedding: entity.embedding.clone(),
                created_at: entity.created_at,
            },
        );
    }

    fn emit<T: Serialize>(&self, kind: EventKind, details: &T) {
        match serde_json::to_value(details) {
            Ok(payload) => self.sink.append_event(kind, payload),
            Err(e) => warn!(kind = kind.as_str(), error = %e, "Failed to serialize event details"),
        }
    }

    fn reject(&self, operation: &str, entity_id: Option<EntityId>, err: EngineError) -> EngineError {
        warn!(operation, entity_id = ?entity_id, error = %err, "Operation rejected");
        self.emit(
            EventKind::Rejected,
            &RejectedDetails {
                operation: operation.to_owned(),
                entity_id,
                code: err.code().to_owned(),
                reason: err.to_string(),
            },
        );
        err
    }
}

fn build_entity(label: String, identity: &[u8], config: &EngineConfig) -> Entity {
    let equilibrium = Anchor::Equilibrium.vector(config.embedding.dimension);
    let fingerprint = spawn_fingerprint(identity, &equilibrium);
    let mut entity = Entity {
        id: EntityId::new(),
        label,
        fingerprint,
        status: LifecycleStatus::Spawning,
        embedding: equilibrium.clone(),
        history: VecDeque::from([equilibrium]),
        max_history: config.embedding.max_history,
        molt_count: 0,
        last_anchor_distribution: None,
        created_at: Utc::now(),
    };
    entity.status = LifecycleStatus::Active;
    entity
}

/// Resistance to being overwritten: `molt_count + 1`.
#[allow(clippy::cast_precision_loss)]
const fn crystallization(molt_count: u64) -> f64 {
    molt_count as f64 + 1.0
}
