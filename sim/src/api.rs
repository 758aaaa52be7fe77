//! Public API for the simulation.
//!
//! `SimWorld` is the single writer. It holds both coordinators, the tick
//! counter, the config and the random source as ECS resources, and runs the
//! schedule once per tick. Hazard activation queries are evaluated at the
//! current tick.

use bevy_ecs::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::components::*;
use crate::config::SimConfig;
use crate::error::IndexError;
use crate::generation::{populate, GenerationError, GenerationReport, MapSpec};
use crate::grid::GridPositionIndex;
use crate::hazards::HazardIndex;
use crate::systems::*;
use crate::world::{Snapshot, SnapshotError};

/// The main simulation world container.
///
/// Holds the ECS world and schedule, providing a clean API for:
/// - Initializing the simulation
/// - Stepping the simulation forward
/// - Mutating and querying hazards, nodes and occupants
/// - Taking and restoring snapshots
pub struct SimWorld {
    world: World,
    schedule: Schedule,
}

impl SimWorld {
    /// Create a new empty simulation world.
    pub fn new() -> Self {
        Self::with_config(SimConfig::default())
    }

    /// Create an empty world with custom configuration.
    pub fn with_config(config: SimConfig) -> Self {
        let hazards = HazardIndex::new(config.bounds(), config.spatial_bucket_width);
        let grid = GridPositionIndex::with_filter(
            config.rows,
            config.cols,
            config.bloom_expected_items,
            config.bloom_false_positive_rate,
        );
        Self::from_parts(config, 0, hazards, grid)
    }

    /// Create a world holding a randomly generated rescue map.
    pub fn new_rescue_map(
        config: SimConfig,
        spec: &MapSpec,
    ) -> Result<(Self, GenerationReport), GenerationError> {
        let mut hazards = HazardIndex::new(config.bounds(), config.spatial_bucket_width);
        let mut grid = GridPositionIndex::with_filter(
            config.rows,
            config.cols,
            config.bloom_expected_items,
            config.bloom_false_positive_rate,
        );
        let mut rng = StdRng::seed_from_u64(config.seed);
        let report = populate(&mut hazards, &mut grid, spec, &mut rng)?;
        Ok((Self::from_parts(config, 0, hazards, grid), report))
    }

    fn from_parts(
        config: SimConfig,
        tick: u64,
        hazards: HazardIndex,
        grid: GridPositionIndex,
    ) -> Self {
        let mut world = World::new();
        // The generator state is not persisted; derive it from seed and tick.
        world.insert_resource(SimRng::seeded(config.seed.wrapping_add(tick)));
        world.insert_resource(SimTick(tick));
        world.insert_resource(hazards);
        world.insert_resource(grid);
        world.insert_resource(config);

        let mut schedule = Schedule::default();
        schedule.add_systems(hazard_relocation_system);

        Self { world, schedule }
    }

    /// Advance one tick and run every system.
    pub fn step(&mut self) {
        self.world.resource_mut::<SimTick>().increment();
        self.schedule.run(&mut self.world);
    }

    pub fn current_tick(&self) -> u64 {
        self.world.resource::<SimTick>().0
    }

    pub fn config(&self) -> &SimConfig {
        self.world.resource::<SimConfig>()
    }

    pub fn hazards(&self) -> &HazardIndex {
        self.world.resource::<HazardIndex>()
    }

    pub fn grid(&self) -> &GridPositionIndex {
        self.world.resource::<GridPositionIndex>()
    }

    // ========================================================================
    // Hazards
    // ========================================================================

    pub fn add_hazard(&mut self, hazard: Hazard) -> Result<(), IndexError> {
        self.world.resource_mut::<HazardIndex>().add_hazard(hazard)
    }

    pub fn spawn_hazard(&mut self, kind: HazardKind, center: Cell) -> Result<HazardId, IndexError> {
        self.world.resource_mut::<HazardIndex>().spawn(kind, center)
    }

    pub fn remove_hazard(&mut self, id: HazardId) -> Result<Hazard, IndexError> {
        self.world.resource_mut::<HazardIndex>().remove_hazard(id)
    }

    pub fn relocate_hazard(&mut self, id: HazardId, center: Cell) -> Result<Cell, IndexError> {
        self.world.resource_mut::<HazardIndex>().relocate(id, center)
    }

    pub fn is_cell_hazardous(&self, cell: Cell) -> bool {
        self.hazards().is_cell_hazardous(cell, self.current_tick())
    }

    pub fn hazards_affecting(&self, cell: Cell) -> Vec<Hazard> {
        self.hazards()
            .hazards_affecting(cell, self.current_tick())
            .into_iter()
            .copied()
            .collect()
    }

    // ========================================================================
    // Grid
    // ========================================================================

    pub fn set_node_state(
        &mut self,
        cell: Cell,
        state: NodeState,
    ) -> Result<Option<ResourceRecord>, IndexError> {
        self.world
            .resource_mut::<GridPositionIndex>()
            .set_node_state(cell, state)
    }

    pub fn place_occupant(
        &mut self,
        id: OccupantId,
        team: Team,
        dest: Cell,
    ) -> Result<Option<Cell>, IndexError> {
        self.world
            .resource_mut::<GridPositionIndex>()
            .place_occupant(id, team, dest)
    }

    pub fn remove_occupant(&mut self, id: OccupantId) -> Result<Occupant, IndexError> {
        self.world.resource_mut::<GridPositionIndex>().remove_occupant(id)
    }

    pub fn take_resource(
        &mut self,
        cell: Cell,
        amount: u32,
    ) -> Result<Option<ResourceRecord>, IndexError> {
        self.world
            .resource_mut::<GridPositionIndex>()
            .take_resource(cell, amount)
    }

    pub fn resource_at(&self, cell: Cell) -> Option<ResourceRecord> {
        self.grid().resource_at(cell).copied()
    }

    pub fn nearest_resource(&self, from: Cell, kind: ResourceKind) -> Option<Cell> {
        self.grid().nearest_resource(from, kind)
    }

    pub fn occupants_at(&self, cell: Cell) -> &[OccupantId] {
        self.grid().occupants_at(cell)
    }

    /// In bounds, traversable and outside every armed hazard.
    pub fn is_cell_safe(&self, cell: Cell) -> bool {
        self.grid().is_traversable(cell) && !self.is_cell_hazardous(cell)
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Canonical state at the current tick.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self.current_tick(), self.config(), self.hazards(), self.grid())
    }

    pub fn snapshot_json(&self) -> Result<String, SnapshotError> {
        self.snapshot().to_json()
    }

    /// Rebuild a world from a snapshot.
    pub fn restore(snapshot: &Snapshot) -> Result<Self, SnapshotError> {
        let (hazards, grid) = snapshot.rebuild()?;
        Ok(Self::from_parts(snapshot.config.clone(), snapshot.tick, hazards, grid))
    }

    pub fn restore_json(json: &str) -> Result<Self, SnapshotError> {
        Self::restore(&Snapshot::from_json(json)?)
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_world() {
        let sim = SimWorld::new();
        assert_eq!(sim.current_tick(), 0);
        assert!(sim.hazards().is_empty());
        assert_eq!(sim.grid().nodes().len(), 2500);
    }

    #[test]
    fn test_step_advances_tick() {
        let mut sim = SimWorld::new();
        sim.step();
        assert_eq!(sim.current_tick(), 1);
        sim.step();
        assert_eq!(sim.current_tick(), 2);
    }

    #[test]
    fn test_queries_use_current_tick() {
        let mut sim = SimWorld::new();
        let hazard = Hazard::new(HazardId(1), HazardKind::SmallCircle, Cell::new(5, 5))
            .with_activation(Activation::Window { from: 2, until: 3 });
        sim.add_hazard(hazard).unwrap();

        assert!(!sim.is_cell_hazardous(Cell::new(5, 5)));
        sim.step();
        sim.step();
        assert!(sim.is_cell_hazardous(Cell::new(5, 5)));
        assert_eq!(sim.hazards_affecting(Cell::new(5, 6)), vec![hazard]);
        assert!(!sim.is_cell_safe(Cell::new(5, 5)));
        sim.step();
        assert!(sim.is_cell_safe(Cell::new(5, 5)));
    }

    #[test]
    fn test_rescue_map_steps_and_restores() {
        let config = SimConfig {
            seed: 17,
            ..SimConfig::default()
        };
        let (mut sim, report) = SimWorld::new_rescue_map(config, &MapSpec::default()).unwrap();
        assert_eq!(report.persons, 10);

        sim.place_occupant(OccupantId(1), Team::Player1, Cell::new(0, 0)).unwrap();
        sim.place_occupant(OccupantId(2), Team::Player2, Cell::new(49, 49)).unwrap();
        for _ in 0..25 {
            sim.step();
        }

        let json = sim.snapshot_json().unwrap();
        let restored = SimWorld::restore_json(&json).unwrap();
        assert_eq!(restored.current_tick(), 25);
        assert_eq!(restored.hazards(), sim.hazards());
        assert_eq!(restored.grid(), sim.grid());
        assert_eq!(restored.snapshot(), sim.snapshot());
    }

    #[test]
    fn test_collision_through_api() {
        let mut sim = SimWorld::new();
        sim.place_occupant(OccupantId(1), Team::Player1, Cell::new(3, 3)).unwrap();
        let err = sim
            .place_occupant(OccupantId(9), Team::Player2, Cell::new(3, 3))
            .unwrap_err();
        assert!(matches!(err, IndexError::Collision { occupant: OccupantId(1), .. }));
        assert!(sim.grid().occupant(OccupantId(9)).is_none());
    }
}
