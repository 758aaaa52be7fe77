//! Snapshot types.
//!
//! A `Snapshot` holds canonical data only: the config, the hazard list and
//! the grid contents. Derived indices are never persisted; restoring a
//! snapshot rebuilds them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::Hazard;
use crate::config::SimConfig;
use crate::error::IndexError;
use crate::grid::{GridPositionIndex, GridState};
use crate::hazards::HazardIndex;

/// Complete simulation state at a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current simulation tick.
    pub tick: u64,
    pub config: SimConfig,
    /// Hazards in canonical (registration) order.
    pub hazards: Vec<Hazard>,
    pub grid: GridState,
}

impl Snapshot {
    pub fn capture(tick: u64, config: &SimConfig, hazards: &HazardIndex, grid: &GridPositionIndex) -> Self {
        Self {
            tick,
            config: config.clone(),
            hazards: hazards.hazards().to_vec(),
            grid: grid.to_state(),
        }
    }

    /// Rebuild both coordinators from this snapshot.
    pub fn rebuild(&self) -> Result<(HazardIndex, GridPositionIndex), SnapshotError> {
        let hazards = HazardIndex::from_hazards(
            self.config.bounds(),
            self.config.spatial_bucket_width,
            self.hazards.clone(),
        )?;
        let grid = GridPositionIndex::from_state(
            self.grid.clone(),
            self.config.bloom_expected_items,
            self.config.bloom_false_positive_rate,
        )?;
        Ok((hazards, grid))
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to encode or decode snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot does not describe a valid map: {0}")]
    Rebuild(#[from] IndexError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Cell, HazardKind, NodeState, OccupantId, ResourceKind, Team};

    fn sample() -> (SimConfig, HazardIndex, GridPositionIndex) {
        let config = SimConfig {
            rows: 12,
            cols: 12,
            ..SimConfig::default()
        };
        let mut hazards = HazardIndex::new(config.bounds(), config.spatial_bucket_width);
        hazards.spawn(HazardKind::SmallCircle, Cell::new(3, 3)).unwrap();
        hazards.spawn(HazardKind::Pulsing, Cell::new(8, 8)).unwrap();

        let mut grid = GridPositionIndex::new(config.rows, config.cols);
        grid.set_node_state(Cell::new(0, 0), NodeState::Base(Team::Player1)).unwrap();
        grid.set_node_state(
            Cell::new(6, 1),
            NodeState::Resource {
                kind: ResourceKind::Weapons,
                quantity: 2,
            },
        )
        .unwrap();
        grid.place_occupant(OccupantId(1), Team::Player1, Cell::new(0, 0)).unwrap();
        grid.place_occupant(OccupantId(2), Team::Player1, Cell::new(0, 0)).unwrap();
        (config, hazards, grid)
    }

    #[test]
    fn test_json_restore_rebuilds_identical_indices() {
        let (config, hazards, grid) = sample();
        let snapshot = Snapshot::capture(7, &config, &hazards, &grid);

        let json = snapshot.to_json().unwrap();
        let decoded = Snapshot::from_json(&json).unwrap();
        assert_eq!(decoded, snapshot);

        let (rebuilt_hazards, rebuilt_grid) = decoded.rebuild().unwrap();
        assert_eq!(rebuilt_hazards, hazards);
        assert_eq!(rebuilt_grid, grid);
        assert_eq!(rebuilt_grid.occupants_at(Cell::new(0, 0)), &[OccupantId(1), OccupantId(2)]);
    }

    #[test]
    fn test_invalid_snapshot_is_rejected() {
        let (config, hazards, grid) = sample();
        let mut snapshot = Snapshot::capture(0, &config, &hazards, &grid);
        snapshot.hazards.push(snapshot.hazards[0]);
        assert!(matches!(
            snapshot.rebuild(),
            Err(SnapshotError::Rebuild(IndexError::DuplicateId { .. }))
        ));

        assert!(matches!(Snapshot::from_json("{"), Err(SnapshotError::Json(_))));
    }
}
