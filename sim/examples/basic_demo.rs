//! Basic demonstration of the rescue simulation.
//!
//! Run with: cargo run --example basic_demo
//! Set RUST_LOG=rescue_sim=debug to see every index mutation.

use rescue_sim::{
    Cell, HazardState, MapSpec, OccupantId, ResourceKind, SimConfig, SimWorld, Team,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rescue_sim=info")),
        )
        .init();

    println!("=== Rescue Simulator - Cache Layer Demo ===\n");

    let config = SimConfig {
        seed: 7,
        ..SimConfig::default()
    };
    let (mut sim, report) = match SimWorld::new_rescue_map(config, &MapSpec::default()) {
        Ok(generated) => generated,
        Err(err) => {
            eprintln!("map generation failed: {err}");
            return;
        }
    };
    println!(
        "Generated {} hazards, {} people and {} goods\n",
        report.hazards.len(),
        report.persons,
        report.goods
    );

    let rows = sim.config().rows;
    let cols = sim.config().cols;
    for i in 0..3 {
        let _ = sim.place_occupant(OccupantId(i), Team::Player1, Cell::new(0, 0));
        let _ = sim.place_occupant(OccupantId(100 + i), Team::Player2, Cell::new(rows - 1, cols - 1));
    }

    // Walk one vehicle greedily toward the closest person, avoiding armed hazards.
    let scout = OccupantId(0);
    for _ in 0..40 {
        sim.step();
        let Some(here) = sim.grid().occupant(scout).map(|o| o.cell) else {
            break;
        };
        let Some(goal) = sim.nearest_resource(here, ResourceKind::Person) else {
            break;
        };
        if here == goal {
            if let Ok(Some(taken)) = sim.take_resource(here, 1) {
                println!(
                    "tick {:>3}: scout picked up {:?} at {} (+{} points)",
                    sim.current_tick(),
                    taken.kind,
                    here,
                    taken.value()
                );
            }
            continue;
        }

        let next = sim
            .grid()
            .neighbors(here)
            .into_iter()
            .filter(|cell| sim.is_cell_safe(*cell))
            .min_by_key(|cell| (cell.distance_sq(goal), cell.row, cell.col));
        if let Some(next) = next {
            let _ = sim.place_occupant(scout, Team::Player1, next);
        }
    }

    println!("\nHazard states at tick {}:", sim.current_tick());
    let tick = sim.current_tick();
    for hazard in sim.hazards().hazards() {
        let state = sim.hazards().hazard_state(hazard.id, tick);
        let marker = if state == HazardState::Active { "*" } else { " " };
        println!(
            "  {marker} hazard {:>2} {:?} at {} ({:?})",
            hazard.id, hazard.kind, hazard.center, state
        );
    }

    let json = match sim.snapshot_json() {
        Ok(json) => json,
        Err(err) => {
            eprintln!("snapshot failed: {err}");
            return;
        }
    };
    println!("\nSnapshot: {} bytes of JSON", json.len());

    match SimWorld::restore_json(&json) {
        Ok(restored) => println!(
            "Restored at tick {}; indices identical: {}",
            restored.current_tick(),
            restored.hazards() == sim.hazards() && restored.grid() == sim.grid()
        ),
        Err(err) => eprintln!("restore failed: {err}"),
    }
}
