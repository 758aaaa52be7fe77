//! Random rescue-map generation.
//!
//! Placement order is bases, then hazards, then resources, so resources
//! never land under a hazard or on a base.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::{Cell, HazardId, HazardKind, NodeState, ResourceKind, Team, Terrain};
use crate::error::IndexError;
use crate::grid::GridPositionIndex;
use crate::hazards::HazardIndex;

/// How many of each thing to place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSpec {
    pub large_circles: u32,
    pub small_circles: u32,
    pub horizontal_bands: u32,
    pub vertical_bands: u32,
    pub pulsing: u32,
    /// Stranded people, one unit each.
    pub persons: u32,
    /// Goods of a random kind, one unit each.
    pub goods: u32,
    pub margin: u32,
    pub attempts: u32,
}

impl Default for MapSpec {
    fn default() -> Self {
        Self {
            large_circles: 2,
            small_circles: 3,
            horizontal_bands: 2,
            vertical_bands: 2,
            pulsing: 1,
            persons: 10,
            goods: 50,
            margin: 2,
            attempts: 100,
        }
    }
}

impl MapSpec {
    fn hazard_plan(&self) -> [(HazardKind, u32); 5] {
        [
            (HazardKind::LargeCircle, self.large_circles),
            (HazardKind::SmallCircle, self.small_circles),
            (HazardKind::HorizontalBand, self.horizontal_bands),
            (HazardKind::VerticalBand, self.vertical_bands),
            (HazardKind::Pulsing, self.pulsing),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub hazards: Vec<HazardId>,
    pub persons: u32,
    pub goods: u32,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no room for a {kind:?} hazard after {attempts} attempts")]
    NoSpace { kind: HazardKind, attempts: u32 },
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Home bases sit in opposite corners.
pub fn base_cells(grid: &GridPositionIndex) -> [(Team, Cell); 2] {
    let bounds = grid.bounds();
    [
        (Team::Player1, Cell::new(0, 0)),
        (
            Team::Player2,
            Cell::new(bounds.rows.saturating_sub(1), bounds.cols.saturating_sub(1)),
        ),
    ]
}

/// Fill an empty map with bases, hazards and resources.
pub fn populate<R: Rng + ?Sized>(
    hazards: &mut HazardIndex,
    grid: &mut GridPositionIndex,
    spec: &MapSpec,
    rng: &mut R,
) -> Result<GenerationReport, GenerationError> {
    let mut report = GenerationReport::default();

    for (team, cell) in base_cells(grid) {
        grid.set_node_state(cell, NodeState::Base(team))?;
    }

    for (kind, count) in spec.hazard_plan() {
        for _ in 0..count {
            let is_base = |cell: Cell| {
                grid.node(cell)
                    .is_some_and(|node| matches!(node.terrain, Terrain::Base(_)))
            };
            let center = hazards
                .find_free_center(kind, None, rng, spec.margin, spec.attempts, is_base)
                .ok_or(GenerationError::NoSpace {
                    kind,
                    attempts: spec.attempts,
                })?;
            report.hazards.push(hazards.spawn(kind, center)?);
        }
    }

    let mut free: Vec<Cell> = grid
        .nodes()
        .iter()
        .filter(|node| node.is_empty() && !hazards.is_cell_claimed(node.cell))
        .map(|node| node.cell)
        .collect();
    free.shuffle(rng);

    let wanted = (spec.persons + spec.goods) as usize;
    if free.len() < wanted {
        tracing::warn!(
            target: "rescue_sim::mapgen",
            wanted,
            free = free.len(),
            "mapgen.resources_truncated"
        );
    }

    let mut cells = free.into_iter();
    for cell in cells.by_ref().take(spec.persons as usize) {
        grid.set_node_state(
            cell,
            NodeState::Resource {
                kind: ResourceKind::Person,
                quantity: 1,
            },
        )?;
        report.persons += 1;
    }
    for cell in cells.take(spec.goods as usize) {
        let kind = *ResourceKind::GOODS
            .choose(rng)
            .unwrap_or(&ResourceKind::Clothing);
        grid.set_node_state(cell, NodeState::Resource { kind, quantity: 1 })?;
        report.goods += 1;
    }

    tracing::info!(
        target: "rescue_sim::mapgen",
        hazards = report.hazards.len(),
        persons = report.persons,
        goods = report.goods,
        "mapgen.populated"
    );
    Ok(report)
}
