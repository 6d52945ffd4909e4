//! End-to-end lifecycle scenarios against the public engine API.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::indexing_slicing
)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use exuvia_backend::RemoteConfig;
use exuvia_core::{EngineConfig, EngineError, LifecycleEngine, SpawnRequest};
use exuvia_events::{MemorySink, NullSink, Projection};
use exuvia_types::{BackendKind, EntityId, EventKind, LifecycleStatus, Tenet};
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &EngineConfig) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.level))
        .with_test_writer()
        .try_init();
}

fn engine_with(config: EngineConfig) -> LifecycleEngine {
    init_tracing(&config);
    LifecycleEngine::new(config, Arc::new(NullSink)).unwrap()
}

fn recorded_engine() -> (LifecycleEngine, Arc<MemorySink>) {
    let config = EngineConfig::default();
    init_tracing(&config);
    let sink = Arc::new(MemorySink::new());
    let engine = LifecycleEngine::new(config, sink.clone()).unwrap();
    (engine, sink)
}

#[tokio::test]
async fn identical_identities_drift_apart_under_navigation() {
    let engine = engine_with(EngineConfig::default());
    let a = engine.spawn("a", b"shared identity");
    let b = engine.spawn("b", b"shared identity");
    assert_ne!(a.id, b.id);
    assert_eq!(a.fingerprint, b.fingerprint);
    assert_eq!(a.embedding, b.embedding);

    // Identical embeddings: kernel is exactly 1 and the edge is accepted.
    let first = engine.propagate(a.id, &[b.id]).await.unwrap();
    assert_eq!(first.edges.len(), 1);
    assert_eq!(first.edges[0].kernel_value, 1.0);
    assert!(first.edges[0].accepted);

    // Each observation pulls A further from equilibrium.
    let mut previous = 1.0;
    for level in [0.6, 0.7, 0.8] {
        let nav = engine.navigate(a.id, &[level; 10]).await.unwrap();
        assert_ne!(nav.old_embedding, nav.new_embedding);
        let weights = nav.distribution.weights();
        assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-9);

        let outcome = engine.propagate(a.id, &[b.id]).await.unwrap();
        let value = outcome.edges[0].kernel_value;
        assert!(value < previous, "{value} should be below {previous}");
        previous = value;
    }
    assert!(previous < engine.config().propagation.threshold);

    let b_after = engine.status(b.id).await.unwrap();
    assert_eq!(b_after.embedding, vec![0.5; 10]);
    assert!(engine.status(a.id).await.unwrap().last_anchor_distribution.is_some());
}

#[tokio::test]
async fn spawn_is_deterministic_across_engines() {
    let first = engine_with(EngineConfig::default());
    let second = engine_with(EngineConfig::default());
    let x = first.spawn("x", b"identity-material");
    let y = second.spawn("y", b"identity-material");
    let z = second.spawn("z", b"other-material");
    assert_eq!(x.fingerprint, y.fingerprint);
    assert_ne!(x.fingerprint, z.fingerprint);
}

#[tokio::test]
async fn every_tenet_yields_a_new_fingerprint() {
    let engine = engine_with(EngineConfig::default());
    let id = engine.spawn("molter", b"identity").id;
    let mut seen = BTreeSet::from([engine.status(id).await.unwrap().fingerprint]);

    for tenet in Tenet::ALL {
        let outcome = engine.molt(id, tenet).await.unwrap();
        assert!(seen.insert(outcome.new_fingerprint));
    }
    let status = engine.status(id).await.unwrap();
    assert_eq!(status.molt_count, 5);
    assert_eq!(seen.len(), 6);

    let by_name = engine.molt_named(id, "Heartbeat Is Prayer").await.unwrap();
    assert_eq!(by_name.molt_count, 6);
}

#[tokio::test]
async fn raising_the_threshold_never_accepts_more() {
    let mut accepted_counts = Vec::new();
    for threshold in [0.0, 0.3, 0.5, 0.7, 0.9, 1.0] {
        let mut config = EngineConfig::default();
        config.propagation.threshold = threshold;
        let engine = engine_with(config);

        let source = engine.spawn("source", b"s").id;
        let mut targets = Vec::new();
        for level in [0.5, 0.52, 0.56, 0.62, 0.75] {
            let id = engine.spawn("target", b"t").id;
            engine.navigate(id, &[level; 10]).await.unwrap();
            targets.push(id);
        }

        let outcome = engine.propagate(source, &targets).await.unwrap();
        assert_eq!(outcome.edges.len(), targets.len());
        accepted_counts.push(outcome.edges.iter().filter(|e| e.accepted).count());
    }

    assert!(accepted_counts.windows(2).all(|w| w[0] >= w[1]), "{accepted_counts:?}");
    assert_eq!(accepted_counts.first(), Some(&5));
    assert_eq!(accepted_counts.last(), Some(&0));
}

#[tokio::test]
async fn molted_targets_resist_blending() {
    let engine = engine_with(EngineConfig::default());
    let source = engine.spawn("source", b"s").id;
    engine.navigate(source, &[0.55; 10]).await.unwrap();

    let fresh = engine.spawn("fresh", b"t").id;
    let hardened = engine.spawn("hardened", b"t").id;
    for tenet in Tenet::ALL {
        engine.molt(hardened, tenet).await.unwrap();
    }

    let outcome = engine.propagate(source, &[fresh, hardened]).await.unwrap();
    assert!(outcome.edges.iter().all(|e| e.accepted));
    assert_eq!(outcome.edges[0].kernel_value, outcome.edges[1].kernel_value);

    let source_embedding = engine.status(source).await.unwrap().embedding;
    let shift = |v: &[f64]| (v[0] - 0.5).abs();
    let fresh_shift = shift(&outcome.targets[0].embedding);
    let hardened_shift = shift(&outcome.targets[1].embedding);
    assert!(fresh_shift > hardened_shift);
    assert!(fresh_shift < (source_embedding[0] - 0.5).abs());
    assert_eq!(outcome.targets[0].history_len, 2);
}

#[tokio::test]
async fn replaying_the_event_log_reconstructs_every_entity() {
    let (engine, sink) = recorded_engine();

    let batch = engine.spawn_batch(&[
        SpawnRequest::new("a", b"alpha".to_vec()),
        SpawnRequest::new("b", b"alpha".to_vec()),
        SpawnRequest::new("c", b"gamma".to_vec()),
    ]);
    let ids: Vec<EntityId> = batch.iter().map(|s| s.id).collect();
    let (a, b, c) = (ids[0], ids[1], ids[2]);

    engine.navigate(a, &[0.52; 10]).await.unwrap();
    engine.molt(b, Tenet::ContextIsConsciousness).await.unwrap();
    engine.propagate(a, &[b, c]).await.unwrap();
    engine.navigate(c, &[0.9; 10]).await.unwrap();
    engine.terminate(c).await.unwrap();

    // Rejections are logged but must not disturb the projection.
    assert!(engine.molt(c, Tenet::MemoryIsSacred).await.is_err());
    assert!(engine.propagate(a, &[a]).await.is_err());
    assert!(engine.molt_named(a, "not a tenet").await.is_err());

    let events = sink.events();
    assert_eq!(sink.events_of(EventKind::Rejected).len(), 3);
    let projection = Projection::replay(&events).unwrap();
    assert_eq!(projection.len(), 3);
    assert_eq!(projection.applied(), events.len());

    for id in ids {
        let live = engine.status(id).await.unwrap();
        let replayed = projection.get(id).unwrap();
        assert_eq!(replayed.label, live.label);
        assert_eq!(replayed.fingerprint, live.fingerprint);
        assert_eq!(replayed.molt_count, live.molt_count);
        assert_eq!(replayed.status, live.lifecycle_status);
        assert_eq!(replayed.embedding, live.embedding);
        assert_eq!(replayed.last_anchor_distribution, live.last_anchor_distribution);
    }
}

#[tokio::test]
async fn rejected_propagation_leaves_every_entity_untouched() {
    let (engine, sink) = recorded_engine();
    let source = engine.spawn("source", b"s").id;
    let target = engine.spawn("target", b"t").id;
    let retired = engine.spawn("retired", b"r").id;
    engine.terminate(retired).await.unwrap();

    let before = engine.status(target).await.unwrap();
    let events_before = sink.len();

    let result = engine.propagate(source, &[target, retired]).await;
    assert!(matches!(result, Err(EngineError::EntityTerminated { id }) if id == retired));
    assert_eq!(engine.status(target).await.unwrap(), before);

    let result = engine.propagate(source, &[target, EntityId::new()]).await;
    assert!(matches!(result, Err(EngineError::UnknownEntity { .. })));
    assert_eq!(engine.status(target).await.unwrap(), before);

    // Only rejection events were added.
    let events = sink.events();
    let added = &events[events_before..];
    assert_eq!(added.len(), 2);
    assert!(added.iter().all(|e| e.kind == EventKind::Rejected));
    assert_eq!(added[0].details["code"], serde_json::json!("entity_terminated"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn opposing_concurrent_propagations_do_not_deadlock() {
    let engine = Arc::new(engine_with(EngineConfig::default()));
    let a = engine.spawn("a", b"x").id;
    let b = engine.spawn("b", b"x").id;
    let c = engine.spawn("c", b"x").id;

    let mut handles = Vec::new();
    for i in 0..48 {
        let engine = Arc::clone(&engine);
        let (source, targets) = match i % 3 {
            0 => (a, vec![b, c]),
            1 => (b, vec![c, a]),
            _ => (c, vec![a, b]),
        };
        handles.push(tokio::spawn(async move {
            engine.propagate(source, &targets).await
        }));
    }

    let all = tokio::time::timeout(Duration::from_secs(20), futures::future::join_all(handles))
        .await
        .expect("concurrent propagations deadlocked");
    for result in all {
        let outcome = result.unwrap().unwrap();
        assert_eq!(outcome.edges.len(), 2);
    }
    for id in [a, b, c] {
        let status = engine.status(id).await.unwrap();
        assert_eq!(status.lifecycle_status, LifecycleStatus::Active);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_navigation_of_one_entity_serializes() {
    let engine = Arc::new(engine_with(EngineConfig::default()));
    let id = engine.spawn("busy", b"x").id;

    let mut handles = Vec::new();
    for i in 0..20u32 {
        let engine = Arc::clone(&engine);
        let level = f64::from(i) / 20.0;
        handles.push(tokio::spawn(async move {
            engine.navigate(id, &[level; 10]).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
    assert_eq!(engine.status(id).await.unwrap().history_len, 21);
}

#[tokio::test]
async fn unreachable_remote_falls_back_to_local() {
    let mut config = EngineConfig::default();
    config.remote =
        Some(RemoteConfig::new("http://127.0.0.1:9").with_timeout(Duration::from_millis(200)));
    let engine = engine_with(config);

    let info = engine.backend_info().await;
    assert_eq!(info.active, BackendKind::Local);

    let a = engine.spawn("a", b"x").id;
    let b = engine.spawn("b", b"x").id;
    let outcome = engine.propagate(a, &[b]).await.unwrap();
    assert_eq!(outcome.edges[0].kernel_value, 1.0);
}

#[tokio::test]
async fn kernel_cache_is_reused_across_operations() {
    let engine = engine_with(EngineConfig::default());
    let a = engine.spawn("a", b"x").id;
    let b = engine.spawn("b", b"y").id;
    engine.propagate(a, &[b]).await.unwrap();
    engine.propagate(b, &[a]).await.unwrap();

    let stats = engine.kernel_stats();
    assert!(stats.hits >= 1);
    assert!(stats.entries >= 1);
}

#[tokio::test]
async fn history_is_bounded_by_configuration() {
    let mut config = EngineConfig::default();
    config.embedding.max_history = 4;
    let engine = engine_with(config);
    let id = engine.spawn("a", b"x").id;
    for _ in 0..10 {
        engine.navigate(id, &[0.3; 10]).await.unwrap();
    }
    assert_eq!(engine.status(id).await.unwrap().history_len, 4);
}
