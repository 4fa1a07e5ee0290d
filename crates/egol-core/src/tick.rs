//! A single simulation tick.
//!
//! Phases, strictly in order:
//!
//! 1. **Step** -- apply the per-organism constraints and collect updates
//! 2. **Persist state** -- write `{sim_id}-{iteration}-state`
//! 3. **Persist updates** -- write `{sim_id}-{iteration}-update`
//! 4. **Broadcast** -- state frames to new clients, update frames to the rest
//!
//! If either write fails the tick stops there: nothing is broadcast and
//! the caller must not advance the iteration counter.

use egol_types::{LifeState, Population, Updates};
use tracing::{debug, info};

use crate::broadcast::{self, BroadcastReport};
use crate::persist::{KeyValueStore, PersistError, STATE_SUFFIX, SnapshotPersister, UPDATE_SUFFIX};
use crate::population;
use crate::registry::{ClientRegistry, Outbound};

/// Errors that abort a tick before broadcast.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// Writing one of the tick records failed.
    #[error("failed to persist {suffix} record for iteration {iteration}: {source}")]
    Persist {
        /// Which record (`state` or `update`).
        suffix: &'static str,
        /// Iteration being persisted.
        iteration: u64,
        /// The underlying persistence error.
        source: PersistError,
    },
}

/// Summary of a completed tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSummary {
    /// The iteration that ran.
    pub iteration: u64,
    /// Organisms alive after the tick.
    pub alive: usize,
    /// Organisms dead after the tick.
    pub dead: usize,
    /// Broadcast outcome.
    pub broadcast: BroadcastReport,
}

/// Run one tick against `population`.
///
/// The population is mutated by the step phase even when persistence
/// later fails.
///
/// # Errors
///
/// Returns [`TickError::Persist`] if either record cannot be written. No
/// frames are sent in that case.
pub async fn run_tick<S, O>(
    population: &mut Population,
    iteration: u64,
    persister: &SnapshotPersister<S>,
    registry: &ClientRegistry<O>,
) -> Result<TickSummary, TickError>
where
    S: KeyValueStore,
    O: Outbound,
{
    // --- Phase 1: Step ---
    let updates = population::apply_tick(population);

    // --- Phase 2 & 3: Persist ---
    persist(persister, iteration, STATE_SUFFIX, &*population).await?;
    persist(persister, iteration, UPDATE_SUFFIX, &updates).await?;

    let (alive, dead) = census(population);
    info!(iteration, alive, dead, "Iteration persisted");
    log_updates(&updates);

    // --- Phase 4: Broadcast ---
    let report = broadcast::broadcast(registry, population, &updates).await;
    debug!(
        iteration,
        state_frames = report.state_frames,
        update_frames = report.update_frames,
        failures = report.failures,
        "Broadcast complete"
    );

    Ok(TickSummary {
        iteration,
        alive,
        dead,
        broadcast: report,
    })
}

async fn persist<S, T>(
    persister: &SnapshotPersister<S>,
    iteration: u64,
    suffix: &'static str,
    value: &T,
) -> Result<(), TickError>
where
    S: KeyValueStore,
    T: serde::Serialize + Sync + ?Sized,
{
    persister
        .store(suffix, iteration, value)
        .await
        .map_err(|source| TickError::Persist {
            suffix,
            iteration,
            source,
        })
}

/// Count living and dead organisms.
pub fn census(population: &Population) -> (usize, usize) {
    let dead = population
        .values()
        .filter(|o| o.state.life == LifeState::Dead)
        .count();
    (population.len().saturating_sub(dead), dead)
}

fn log_updates(updates: &Updates) {
    for update in updates.values() {
        debug!(
            organism_id = %update.id,
            state = ?update.state.life,
            x = update.state.position.x,
            y = update.state.position.y,
            "Organism update"
        );
    }
}
