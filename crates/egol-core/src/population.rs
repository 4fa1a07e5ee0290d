//! Organism population: spawning and the per-tick stepper.
//!
//! The population is created once at startup and its key set never
//! changes afterwards. Dead organisms stay in the map.
//!
//! Each tick applies two constraints to every organism, in order:
//!
//! 1. **Energy decay** -- `energy -= 0.01 + 0.1 * size`. Not clamped.
//! 2. **Liveness** -- an organism whose energy is `<= 0` becomes dead;
//!    otherwise it keeps its prior liveness.
//!
//! Positions are carried over unchanged and organisms never interact.

use egol_types::{
    Attributes, LifeState, Organism, OrganismId, Population, Position, State, Update, Updates,
};
use rand::Rng;

/// Energy every organism burns per tick regardless of size.
pub const BASE_ENERGY_COST: f64 = 0.01;

/// Additional energy burned per tick per unit of size.
pub const SIZE_ENERGY_FACTOR: f64 = 0.1;

/// Population size used when none is configured.
pub const DEFAULT_POPULATION: usize = 4;

/// Spawn `count` organisms with randomized attributes.
///
/// Every organism starts alive with `energy = 1.0` and `hunger = 0.0` at a
/// random position.
pub fn spawn<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Population {
    let mut population = Population::new();
    for _ in 0..count {
        let organism = random_organism(rng);
        population.insert(organism.id, organism);
    }
    population
}

/// Build one organism with randomized attributes.
pub fn random_organism<R: Rng + ?Sized>(rng: &mut R) -> Organism {
    Organism {
        id: OrganismId::new(),
        state: State {
            life: LifeState::Alive,
            position: random_position(rng),
        },
        attributes: Attributes {
            family: rng.random_range(0..3),
            hunger: 0.0,
            energy: 1.0,
            offense: rng.random_range(0..10),
            defense: rng.random_range(0..10),
            agility: rng.random_range(0..10),
            range: rng.random::<f64>() * 100.0,
            reproductivity: rng.random_range(0..10),
            size: rng.random::<f64>(),
        },
    }
}

/// Uniform random point in the `[-1, 1) x [-1, 1)` square.
pub fn random_position<R: Rng + ?Sized>(rng: &mut R) -> Position {
    Position::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0))
}

/// Energy burned by an organism of the given size in one tick.
#[allow(clippy::suboptimal_flops)]
pub fn energy_cost(size: f64) -> f64 {
    BASE_ENERGY_COST + size * SIZE_ENERGY_FACTOR
}

/// Advance every organism by one tick.
///
/// Mutates the population in place and returns one [`Update`] per
/// organism, keyed by the same ID. The returned updates always agree with
/// the post-tick population.
pub fn apply_tick(population: &mut Population) -> Updates {
    population
        .values_mut()
        .map(|organism| {
            apply_constraints(organism);
            (
                organism.id,
                Update {
                    id: organism.id,
                    state: organism.state,
                },
            )
        })
        .collect()
}

/// Apply the per-tick constraints to one organism.
pub fn apply_constraints(organism: &mut Organism) {
    decay_energy(&mut organism.attributes);
    update_liveness(&mut organism.state, organism.attributes.energy);
}

fn decay_energy(attributes: &mut Attributes) {
    attributes.energy -= energy_cost(attributes.size);
}

fn update_liveness(state: &mut State, energy: f64) {
    if energy <= 0.0 {
        state.life = LifeState::Dead;
    }
}
