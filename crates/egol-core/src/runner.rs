//! The frame-paced simulation loop.
//!
//! [`run_simulation`] wraps [`run_tick`] with:
//!
//! - **Exit handshake**: the shutdown listener is polled without blocking
//!   at the top of every iteration; the loop acknowledges once it stops
//! - **Frame pacing**: each pass sleeps out the remainder of `frame_ms`
//! - **Failure isolation**: a tick whose persistence fails is logged and
//!   retried on the next frame under the same iteration number
//!
//! A tick is never cancelled halfway through.
//!
//! [`run_tick`]: crate::tick::run_tick

use egol_types::Population;
use tokio::time::Instant;
use tracing::{error, info};

use crate::clock::{ClockError, FrameClock};
use crate::persist::{KeyValueStore, SnapshotPersister};
use crate::registry::{ClientRegistry, Outbound};
use crate::shutdown::ShutdownListener;
use crate::tick::{self, TickSummary};

/// Errors that end the simulation loop early.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The iteration counter could not advance.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },
}

/// Everything the tick loop owns or shares.
pub struct Simulation<S, O> {
    /// The organism population. Only the loop touches it.
    pub population: Population,
    /// Iteration counter and frame period.
    pub clock: FrameClock,
    /// Record writer for the external store.
    pub persister: SnapshotPersister<S>,
    /// Clients to broadcast to (shared with the accept loop).
    pub registry: ClientRegistry<O>,
}

/// Result of a finished simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// Iterations completed (equal to the next iteration number).
    pub iterations: u64,
    /// Ticks abandoned because persistence failed.
    pub failed_ticks: u64,
    /// The last successful tick, if any.
    pub final_summary: Option<TickSummary>,
}

/// Run ticks until the exit signal is observed.
///
/// Returns after acknowledging the signal.
///
/// # Errors
///
/// Returns [`RunnerError::Clock`] if the iteration counter overflows.
pub async fn run_simulation<S, O>(
    sim: &mut Simulation<S, O>,
    mut shutdown: ShutdownListener,
) -> Result<SimulationResult, RunnerError>
where
    S: KeyValueStore,
    O: Outbound,
{
    let mut failed_ticks: u64 = 0;
    let mut final_summary = None;

    info!(
        sim_id = sim.persister.sim_id(),
        frame_ms = u64::try_from(sim.clock.frame().as_millis()).unwrap_or(u64::MAX),
        organisms = sim.population.len(),
        "Simulation starting"
    );

    loop {
        let started = Instant::now();

        // --- Check exit signal (before tick) ---
        if shutdown.is_requested() {
            info!(iteration = sim.clock.iteration(), "Exit requested, stopping tick loop");
            break;
        }

        // --- Execute tick ---
        let iteration = sim.clock.iteration();
        let outcome =
            tick::run_tick(&mut sim.population, iteration, &sim.persister, &sim.registry).await;

        // --- Sleep for the rest of the frame ---
        sim.clock.pace(started).await;

        match outcome {
            Ok(summary) => {
                final_summary = Some(summary);
                sim.clock.advance()?;
            }
            Err(e) => {
                error!(iteration, error = %e, "Tick abandoned");
                failed_ticks = failed_ticks.saturating_add(1);
            }
        }
    }

    let result = SimulationResult {
        iterations: sim.clock.iteration(),
        failed_ticks,
        final_summary,
    };
    shutdown.acknowledge();
    Ok(result)
}

/// Log the end of a run.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        iterations = result.iterations,
        failed_ticks = result.failed_ticks,
        final_alive = result.final_summary.as_ref().map(|s| s.alive),
        final_dead = result.final_summary.as_ref().map(|s| s.dead),
        "Simulation ended"
    );
}
