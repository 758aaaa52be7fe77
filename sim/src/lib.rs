//! Rescue Simulator - Spatial and Identity Cache Layer
//!
//! A tick-driven grid simulation of a rescue map: hazards that cover areas of
//! the grid, resources waiting to be collected, and vehicles of two teams.
//! Every entity kind lives in one canonical collection owned by a coordinator
//! (`HazardIndex`, `GridPositionIndex`), which keeps its derived lookup
//! structures in sync on every mutation. Uses `bevy_ecs` to host the
//! coordinators as resources and to drive the per-tick systems.

pub mod api;
pub mod bloom;
pub mod bucket;
pub mod components;
pub mod config;
pub mod error;
pub mod generation;
pub mod grid;
pub mod hashing;
pub mod hazards;
pub mod identity;
pub mod spatial;
pub mod spatial_cache;
pub mod systems;
pub mod world;

pub use api::SimWorld;
pub use bloom::BloomFilter;
pub use bucket::BucketMap;
pub use components::*;
pub use config::{ConfigError, SimConfig};
pub use error::IndexError;
pub use generation::{populate, GenerationError, GenerationReport, MapSpec};
pub use grid::{GridPositionIndex, GridState};
pub use hashing::{cell_from_key, cell_key, hash_str, CellKey, Djb2Hasher};
pub use hazards::{HazardIndex, HazardState};
pub use identity::{HasId, IdentityIndex};
pub use spatial::{HasPosition, SpatialEntry, SpatialHashTable};
pub use spatial_cache::SpatialCache;
pub use systems::{hazard_relocation_system, SimRng, SimTick};
pub use world::{Snapshot, SnapshotError};
