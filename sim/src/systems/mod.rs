//! ECS systems and shared resources for the rescue simulation.
//!
//! Systems only touch the coordinators through their methods, so every
//! derived index is consistent whenever a system returns.
//!
//! ## Schedule
//!
//! - `hazard_relocation_system` - moves pulsing hazards as they re-arm

pub mod relocation;

pub use relocation::*;

use bevy_ecs::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Global simulation tick counter.
/// Incremented once per `SimWorld::step`, before the schedule runs.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimTick(pub u64);

impl SimTick {
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}

/// Seeded random source shared by the systems.
#[derive(Resource, Debug, Clone)]
pub struct SimRng(pub StdRng);

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}
