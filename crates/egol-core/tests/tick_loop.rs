//! End-to-end tests of the tick loop against in-process stores and
//! recording client connections.
//!
//! All tests run on a paused Tokio clock so frame pacing is exact.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::arithmetic_side_effects,
    clippy::missing_panics_doc
)]

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use egol_core::persist::{KeyValueStore, MemoryStore, SnapshotPersister, StoreError};
use egol_core::registry::{Client, ClientRegistry, Outbound, SendError};
use egol_core::runner::{Simulation, SimulationResult, run_simulation};
use egol_core::{FrameClock, population, shutdown};
use egol_types::{LifeState, Population};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;

const FRAME_MS: u64 = 10;

// =============================================================================
// Test doubles
// =============================================================================

/// Records every text frame as parsed JSON.
#[derive(Clone, Default)]
struct RecordingConn {
    frames: Arc<Mutex<Vec<Value>>>,
}

impl RecordingConn {
    fn kinds(&self) -> Vec<String> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .map(|f| f["type"].as_str().unwrap_or_default().to_owned())
            .collect()
    }
}

impl Outbound for RecordingConn {
    async fn send_text(&self, text: &str) -> Result<(), SendError> {
        let value = serde_json::from_str(text).map_err(|e| SendError::Encode(e.to_string()))?;
        self.frames.lock().unwrap().push(value);
        Ok(())
    }
}

/// Memory store that fails the first write to one key.
#[derive(Clone)]
struct FlakyStore {
    inner: MemoryStore,
    fail_key: String,
    failed: Arc<Mutex<bool>>,
    attempts: Arc<Mutex<Vec<String>>>,
}

impl FlakyStore {
    fn failing_once(fail_key: &str) -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_key: fail_key.to_owned(),
            failed: Arc::new(Mutex::new(false)),
            attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl KeyValueStore for FlakyStore {
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.attempts.lock().unwrap().push(key.to_owned());
        let should_fail = {
            let mut failed = self.failed.lock().unwrap();
            let hit = key == self.fail_key && !*failed;
            if hit {
                *failed = true;
            }
            hit
        };
        if should_fail {
            return Err(StoreError::Write {
                key: key.to_owned(),
                reason: "injected failure".to_owned(),
            });
        }
        self.inner.set(key, value).await
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn simulation<S: KeyValueStore>(
    store: S,
    population: Population,
) -> Simulation<S, RecordingConn> {
    Simulation {
        population,
        clock: FrameClock::new(FRAME_MS).unwrap(),
        persister: SnapshotPersister::new("abc".to_owned(), store),
        registry: ClientRegistry::new(),
    }
}

/// Run the loop until `ticks` frames have started, then request exit.
async fn run_for<S>(
    mut sim: Simulation<S, RecordingConn>,
    ticks: u64,
) -> (SimulationResult, Simulation<S, RecordingConn>)
where
    S: KeyValueStore + 'static,
{
    let (trigger, listener) = shutdown::channel();
    let handle = tokio::spawn(async move {
        let result = run_simulation(&mut sim, listener).await.unwrap();
        (result, sim)
    });

    // Frames start at 0, FRAME_MS, 2*FRAME_MS, ...; land mid-frame after
    // the last wanted start.
    let wait = FRAME_MS
        .checked_mul(ticks.saturating_sub(1))
        .unwrap()
        .saturating_add(FRAME_MS / 2);
    tokio::time::sleep(Duration::from_millis(wait)).await;
    assert!(trigger.request().await, "loop must acknowledge exit");
    handle.await.unwrap()
}

fn expected_keys(iterations: u64) -> BTreeSet<String> {
    (0..iterations)
        .flat_map(|i| [format!("abc-{i}-state"), format!("abc-{i}-update")])
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn three_ticks_write_six_keys_in_order() {
    let store = MemoryStore::new();
    let population = population::spawn(4, &mut StdRng::seed_from_u64(1));
    let (result, _) = run_for(simulation(store.clone(), population), 3).await;

    assert_eq!(result.iterations, 3);
    assert_eq!(result.failed_ticks, 0);
    let keys: BTreeSet<String> = store.keys().await.into_iter().collect();
    assert_eq!(keys, expected_keys(3));
    assert_eq!(
        store.write_log().await,
        vec![
            "abc-0-state",
            "abc-0-update",
            "abc-1-state",
            "abc-1-update",
            "abc-2-state",
            "abc-2-update",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn energy_decays_to_death_over_seventeen_ticks() {
    let mut population = population::spawn(1, &mut StdRng::seed_from_u64(2));
    let id = *population.keys().next().unwrap();
    population.get_mut(&id).unwrap().attributes.size = 0.5;

    let store = MemoryStore::new();
    let (result, sim) = run_for(simulation(store.clone(), population), 17).await;
    assert_eq!(result.iterations, 17);

    let organism = &sim.population[&id];
    assert!(organism.attributes.energy <= 0.0);
    assert_eq!(organism.state.life, LifeState::Dead);

    // Iteration 15 (the 16th tick) still had energy left.
    let raw = store.get("abc-15-state").await.unwrap();
    let snapshot: Value = serde_json::from_slice(&raw).unwrap();
    let energy = snapshot[id.to_string()]["attributes"]["energy"]
        .as_f64()
        .unwrap();
    assert!((energy - 0.04).abs() < 1e-9);
    assert_eq!(snapshot[id.to_string()]["state"]["type"], "alive");

    let raw = store.get("abc-16-update").await.unwrap();
    let updates: Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(updates[id.to_string()]["state"]["type"], "dead");
}

#[tokio::test(start_paused = true)]
async fn failed_update_write_skips_broadcast_and_holds_iteration() {
    let store = FlakyStore::failing_once("abc-5-update");
    let population = population::spawn(4, &mut StdRng::seed_from_u64(3));
    let sim = simulation(store.clone(), population);

    let conn = RecordingConn::default();
    sim.registry.set(Arc::new(Client::new(conn.clone()))).await;

    let (result, _) = run_for(sim, 10).await;

    // Ten frames ran; one was abandoned.
    assert_eq!(result.failed_ticks, 1);
    assert_eq!(result.iterations, 9);

    // The failed frame wrote abc-5-state, never reached broadcast, and the
    // next frame retried iteration 5 from the state write.
    let attempts = store.attempts.lock().unwrap().clone();
    let fifth: Vec<&str> = attempts
        .iter()
        .map(String::as_str)
        .filter(|k| k.starts_with("abc-5-") || k.starts_with("abc-6-"))
        .collect();
    assert_eq!(
        fifth,
        vec![
            "abc-5-state",
            "abc-5-update",
            "abc-5-state",
            "abc-5-update",
            "abc-6-state",
            "abc-6-update",
        ]
    );

    // One frame per completed iteration: no broadcast for the failed one.
    let kinds = conn.kinds();
    assert_eq!(kinds.len(), 9);
    assert_eq!(kinds[0], "state");
    assert!(kinds[1..].iter().all(|k| k == "update"));

    let keys: BTreeSet<String> = store.inner.keys().await.into_iter().collect();
    assert_eq!(keys, expected_keys(9));
}

#[tokio::test(start_paused = true)]
async fn late_client_gets_one_state_frame_then_updates() {
    let store = MemoryStore::new();
    let population = population::spawn(4, &mut StdRng::seed_from_u64(4));
    let mut sim = simulation(store, population);
    let registry = sim.registry.clone();

    let (trigger, listener) = shutdown::channel();
    let handle = tokio::spawn(async move { run_simulation(&mut sim, listener).await.unwrap() });

    // Join halfway through the third frame.
    tokio::time::sleep(Duration::from_millis(FRAME_MS * 2 + FRAME_MS / 2)).await;
    let conn = RecordingConn::default();
    registry.set(Arc::new(Client::new(conn.clone()))).await;

    tokio::time::sleep(Duration::from_millis(FRAME_MS * 4)).await;
    assert!(trigger.request().await);
    let result = handle.await.unwrap();

    let kinds = conn.kinds();
    assert!(kinds.len() >= 3);
    assert_eq!(kinds[0], "state");
    assert!(kinds[1..].iter().all(|k| k == "update"));
    assert!(result.final_summary.is_some());
}

#[tokio::test(start_paused = true)]
async fn exit_stops_writes() {
    let store = MemoryStore::new();
    let population = population::spawn(2, &mut StdRng::seed_from_u64(5));
    let (result, _) = run_for(simulation(store.clone(), population), 2).await;

    let written = store.len().await;
    tokio::time::sleep(Duration::from_millis(FRAME_MS * 5)).await;
    assert_eq!(store.len().await, written);
    assert_eq!(written, 4);
    assert_eq!(result.iterations, 2);
}
