//! Tick loop and client fan-out for the Egol simulation server.
//!
//! This crate owns the frame-paced loop that drives the simulation. Every
//! iteration steps the population, writes a state record and an update
//! record to the external store, then broadcasts to connected clients.
//!
//! # Modules
//!
//! - [`clock`] -- Iteration counter and frame pacing
//! - [`config`] -- Layered configuration (defaults, YAML, environment)
//! - [`population`] -- Organism spawning and the per-tick stepper
//! - [`persist`] -- Key-value contract and the per-iteration persister
//! - [`registry`] -- Concurrent client registry and the outbound contract
//! - [`broadcast`] -- State/update fan-out policy
//! - [`tick`] -- One tick: step, persist, broadcast
//! - [`runner`] -- The loop around [`tick::run_tick`]
//! - [`shutdown`] -- Exit handshake between the server and the loop

pub mod broadcast;
pub mod clock;
pub mod config;
pub mod persist;
pub mod population;
pub mod registry;
pub mod runner;
pub mod shutdown;
pub mod tick;

// Re-export primary types for convenience.
pub use clock::FrameClock;
pub use config::SimConfig;
pub use persist::{KeyValueStore, MemoryStore, SnapshotPersister, StoreError};
pub use registry::{Client, ClientRegistry, Outbound, SendError};
pub use runner::{Simulation, SimulationResult, run_simulation};
pub use shutdown::{ShutdownListener, ShutdownTrigger};
