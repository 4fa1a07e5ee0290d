//! Organism records: liveness state, position, and fixed attributes.
//!
//! These are both the in-memory population representation and the wire
//! format. Field names serialize in lowercase so the browser client can
//! read `state.type`, `state.position.x`, `attributes.energy` directly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::OrganismId;

/// The full population, keyed by organism ID.
pub type Population = BTreeMap<OrganismId, Organism>;

/// One iteration's worth of updates, keyed by organism ID.
pub type Updates = BTreeMap<OrganismId, Update>;

/// Two-valued liveness discriminator.
///
/// Serializes as `"alive"` or `"dead"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum LifeState {
    /// The organism is alive.
    Alive,
    /// The organism has run out of energy. Terminal.
    Dead,
}

impl LifeState {
    /// Whether this is [`LifeState::Dead`].
    pub const fn is_dead(self) -> bool {
        matches!(self, Self::Dead)
    }
}

/// A point on the 2-D simulation plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Position {
    /// Construct a position from its coordinates.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Tagged per-organism state that changes over time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct State {
    /// Liveness tag, serialized as `type`.
    #[serde(rename = "type")]
    pub life: LifeState,
    /// Current location.
    pub position: Position,
}

/// Organism attributes.
///
/// Everything here is fixed at spawn except `energy`, which the stepper
/// decays every tick, and `hunger`, which is carried but never changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Attributes {
    /// Family tag (0..3 at spawn).
    pub family: u32,
    /// Hunger level.
    pub hunger: f64,
    /// Remaining energy. Starts at 1.0 and is not clamped below zero.
    pub energy: f64,
    /// Offensive strength.
    pub offense: u32,
    /// Defensive strength.
    pub defense: u32,
    /// Agility.
    pub agility: u32,
    /// Interaction range (0..100).
    pub range: f64,
    /// Reproductive drive.
    pub reproductivity: u32,
    /// Body size (0..1). Larger organisms burn energy faster.
    pub size: f64,
}

/// A simulated organism.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Organism {
    /// Primary key.
    pub id: OrganismId,
    /// Mutable state.
    pub state: State,
    /// Attributes.
    pub attributes: Attributes,
}

/// The per-tick delta for one organism: its ID and its next state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Update {
    /// The organism this update applies to.
    pub id: OrganismId,
    /// The organism's state after the tick.
    pub state: State,
}
