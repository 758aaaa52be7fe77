//! Pulsing hazard relocation.

use bevy_ecs::prelude::*;

use crate::config::SimConfig;
use crate::grid::GridPositionIndex;
use crate::hazards::HazardIndex;
use crate::systems::{SimRng, SimTick};

/// Moves every relocating hazard that re-arms on the current tick.
///
/// ## Data Access
/// - Reads: SimTick, SimConfig, GridPositionIndex
/// - Writes: HazardIndex, SimRng
///
/// The new center keeps the hazard's extent `relocation_margin` cells from
/// the edge, overlaps no other hazard and covers no resource cell. A hazard
/// with no such center within `relocation_attempts` samples stays put.
pub fn hazard_relocation_system(
    tick: Res<SimTick>,
    config: Res<SimConfig>,
    grid: Res<GridPositionIndex>,
    mut rng: ResMut<SimRng>,
    mut hazards: ResMut<HazardIndex>,
) {
    for id in hazards.due_for_relocation(tick.0) {
        let target = hazards.find_relocation_target(
            id,
            &mut rng.0,
            config.relocation_margin,
            config.relocation_attempts,
            |cell| grid.resource_at(cell).is_some(),
        );

        let Some(center) = target else {
            tracing::debug!(
                target: "rescue_sim::hazards",
                id = id.0,
                tick = tick.0,
                "hazards.relocation_skipped"
            );
            continue;
        };

        if let Err(err) = hazards.relocate(id, center) {
            tracing::warn!(
                target: "rescue_sim::hazards",
                id = id.0,
                error = %err,
                "hazards.relocation_failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Cell, HazardKind, NodeState, ResourceKind};

    fn world_with(hazards: HazardIndex, grid: GridPositionIndex) -> World {
        let mut world = World::new();
        world.insert_resource(SimTick(0));
        world.insert_resource(SimConfig::default());
        world.insert_resource(SimRng::seeded(3));
        world.insert_resource(hazards);
        world.insert_resource(grid);
        world
    }

    #[test]
    fn test_pulsing_hazard_moves_when_rearmed() {
        let config = SimConfig::default();
        let mut hazards = HazardIndex::new(config.bounds(), config.spatial_bucket_width);
        let id = hazards.spawn(HazardKind::Pulsing, Cell::new(10, 10)).unwrap();
        let mut world = world_with(hazards, GridPositionIndex::new(config.rows, config.cols));

        let mut schedule = Schedule::default();
        schedule.add_systems(hazard_relocation_system);

        let mut centers = Vec::new();
        for tick in 1..=30 {
            world.resource_mut::<SimTick>().0 = tick;
            schedule.run(&mut world);
            let center = world.resource::<HazardIndex>().get(id).map(|h| h.center);
            centers.push((tick, center));
        }

        // Re-arms at ticks 10, 20 and 30; the center only changes there.
        let mut last = Some(Cell::new(10, 10));
        for (tick, center) in centers {
            if tick % 10 != 0 {
                assert_eq!(center, last, "moved off-cycle at tick {tick}");
            }
            last = center;
        }
    }

    #[test]
    fn test_relocation_avoids_resources_and_keeps_indices_in_sync() {
        let config = SimConfig::default();
        let mut hazards = HazardIndex::new(config.bounds(), config.spatial_bucket_width);
        let mut grid = GridPositionIndex::new(config.rows, config.cols);
        for row in (0..config.rows).step_by(4) {
            for col in (0..config.cols).step_by(9) {
                grid.set_node_state(
                    Cell::new(row, col),
                    NodeState::Resource {
                        kind: ResourceKind::Food,
                        quantity: 1,
                    },
                )
                .unwrap();
            }
        }
        let a = hazards.spawn(HazardKind::Pulsing, Cell::new(25, 25)).unwrap();
        hazards.spawn(HazardKind::LargeCircle, Cell::new(40, 40)).unwrap();
        let mut world = world_with(hazards, grid);

        let mut schedule = Schedule::default();
        schedule.add_systems(hazard_relocation_system);

        for tick in 1..=200 {
            world.resource_mut::<SimTick>().0 = tick;
            schedule.run(&mut world);

            let hazards = world.resource::<HazardIndex>();
            let grid = world.resource::<GridPositionIndex>();
            let hazard = hazards.get(a).copied().expect("hazard stays registered");
            assert_eq!(hazards.cells_of(a), hazard.footprint(hazards.bounds()).as_slice());
            for cell in hazards.cells_of(a) {
                assert!(hazards.ids_at(*cell).contains(&a));
            }
            assert!(!hazards.overlaps_any(hazard.kind, hazard.center, Some(a)));
            if tick % 10 == 0 && hazard.center != Cell::new(25, 25) {
                assert!(hazards.cells_of(a).iter().all(|c| grid.resource_at(*c).is_none()));
            }
        }

        let hazards = world.resource::<HazardIndex>();
        let rebuilt = HazardIndex::from_hazards(
            hazards.bounds(),
            config.spatial_bucket_width,
            hazards.hazards().to_vec(),
        )
        .unwrap();
        assert_eq!(&rebuilt, hazards);
    }
}
