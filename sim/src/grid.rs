//! Map graph coordinator.
//!
//! The canonical data is the row-major node array plus the occupant records.
//! Derived from them:
//!
//! - `nodes_by_position`: cell key -> node slot
//! - `resources_by_position`: cell key -> resource record, with a Bloom
//!   filter in front of it for cheap "definitely no resource" answers
//! - `occupants_by_position`: cell key -> occupant ids, in arrival order

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::bloom::BloomFilter;
use crate::components::{
    Cell, GridBounds, Node, NodeState, Occupant, OccupantId, ResourceKind, ResourceRecord, Stock,
    Team, Terrain,
};
use crate::error::IndexError;
use crate::hashing::CellKey;
use crate::identity::{HasId, IdentityIndex};
use crate::spatial_cache::SpatialCache;

/// Canonical grid contents, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridState {
    pub rows: u32,
    pub cols: u32,
    /// Row-major. Cells missing from the list load as open ground.
    pub nodes: Vec<Node>,
    /// Sorted by arrival.
    pub occupants: Vec<Occupant>,
}

#[derive(Resource, Debug, Clone)]
pub struct GridPositionIndex {
    bounds: GridBounds,
    nodes: Vec<Node>,
    nodes_by_position: HashMap<CellKey, usize>,
    resources_by_position: HashMap<CellKey, ResourceRecord>,
    resource_filter: BloomFilter,
    filter_capacity: usize,
    filter_rate: f64,
    occupants: IdentityIndex<Occupant>,
    occupants_by_position: SpatialCache<OccupantId>,
    next_arrival: u64,
}

/// The filter and arrival counter are tuning state, not contents.
impl PartialEq for GridPositionIndex {
    fn eq(&self, other: &Self) -> bool {
        self.bounds == other.bounds
            && self.nodes == other.nodes
            && self.nodes_by_position == other.nodes_by_position
            && self.resources_by_position == other.resources_by_position
            && self.occupants == other.occupants
            && self.occupants_by_position == other.occupants_by_position
    }
}

impl GridPositionIndex {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self::with_filter(rows, cols, 256, 0.01)
    }

    /// Grid of open cells whose resource filter is sized for
    /// `expected_resources` at `false_positive_rate`.
    pub fn with_filter(
        rows: u32,
        cols: u32,
        expected_resources: usize,
        false_positive_rate: f64,
    ) -> Self {
        let bounds = GridBounds::new(rows, cols);
        let mut nodes = Vec::with_capacity(bounds.cell_count());
        nodes.extend(bounds.cells().map(Node::new));
        let nodes_by_position = nodes
            .iter()
            .enumerate()
            .map(|(slot, node)| (node.cell.key(), slot))
            .collect();

        Self {
            bounds,
            nodes,
            nodes_by_position,
            resources_by_position: HashMap::new(),
            resource_filter: BloomFilter::with_rate(expected_resources, false_positive_rate),
            filter_capacity: expected_resources.max(1),
            filter_rate: false_positive_rate,
            occupants: IdentityIndex::new(),
            occupants_by_position: SpatialCache::new(),
            next_arrival: 0,
        }
    }

    /// Rebuild from persisted state.
    pub fn from_state(
        state: GridState,
        expected_resources: usize,
        false_positive_rate: f64,
    ) -> Result<Self, IndexError> {
        let mut grid = Self::with_filter(
            state.rows,
            state.cols,
            expected_resources,
            false_positive_rate,
        );

        for node in state.nodes {
            grid.bounds.check(node.cell)?;
            let state = node.state();
            grid.set_node_state(node.cell, state)?;
        }

        let mut occupants = state.occupants;
        occupants.sort_by_key(|o| o.arrival);
        for occupant in occupants {
            grid.bounds.check(occupant.cell)?;
            grid.check_collision(occupant.id, occupant.team, occupant.cell)?;
            grid.occupants.insert(occupant)?;
            grid.occupants_by_position.insert(occupant.cell.key(), occupant.id);
            grid.next_arrival = grid.next_arrival.max(occupant.arrival + 1);
        }

        tracing::info!(
            target: "rescue_sim::grid",
            rows = grid.bounds.rows,
            cols = grid.bounds.cols,
            resources = grid.resources_by_position.len(),
            occupants = grid.occupants.len(),
            "grid.rebuilt"
        );
        Ok(grid)
    }

    pub fn to_state(&self) -> GridState {
        let mut occupants: Vec<Occupant> = self.occupants.iter().copied().collect();
        occupants.sort_by_key(|o| (o.arrival, o.id));
        GridState {
            rows: self.bounds.rows,
            cols: self.bounds.cols,
            nodes: self.nodes.clone(),
            occupants,
        }
    }

    // ------------------------------------------------------------------
    // Nodes and resources
    // ------------------------------------------------------------------

    /// Set a node's terrain and contents.
    ///
    /// A resource state replaces whatever record the cell held. Any other
    /// state clears it. Returns the record that was at the cell before.
    pub fn set_node_state(
        &mut self,
        cell: Cell,
        state: NodeState,
    ) -> Result<Option<ResourceRecord>, IndexError> {
        self.bounds.check(cell)?;
        let key = cell.key();
        let Some(&slot) = self.nodes_by_position.get(&key) else {
            return Ok(None);
        };

        let displaced = self.resources_by_position.remove(&key);
        let (terrain, stock) = match state {
            NodeState::Empty | NodeState::Resource { quantity: 0, .. } => (Terrain::Open, None),
            NodeState::Blocked => (Terrain::Blocked, None),
            NodeState::Base(team) => (Terrain::Base(team), None),
            NodeState::Resource { kind, quantity } => {
                (Terrain::Open, Some(Stock { kind, quantity }))
            }
        };

        let node = &mut self.nodes[slot];
        node.terrain = terrain;
        node.stock = stock;

        if let Some(stock) = stock {
            let record = ResourceRecord::new(cell, stock.kind, stock.quantity);
            self.resources_by_position.insert(key, record);
            self.note_resource(key);
        }

        if let Some(old) = displaced {
            tracing::debug!(
                target: "rescue_sim::grid",
                cell = %cell,
                kind = ?old.kind,
                quantity = old.quantity,
                "grid.resource_displaced"
            );
        }
        Ok(displaced)
    }

    fn note_resource(&mut self, key: CellKey) {
        // The filter cannot forget keys. Once it has absorbed twice its
        // designed load, rebuild it from the live set.
        if self.resource_filter.inserted() >= self.filter_capacity * 2 {
            self.refresh_filter();
        }
        self.resource_filter.insert(&key);
    }

    fn refresh_filter(&mut self) {
        // Grow with the live set so refreshes stay geometric.
        let capacity = self.filter_capacity.max(self.resources_by_position.len());
        self.filter_capacity = capacity;
        self.resource_filter = BloomFilter::with_rate(capacity, self.filter_rate);
        for key in self.resources_by_position.keys() {
            self.resource_filter.insert(key);
        }
        tracing::debug!(
            target: "rescue_sim::grid",
            live = self.resources_by_position.len(),
            bits = self.resource_filter.bit_len(),
            "grid.resource_filter_refreshed"
        );
    }

    /// Cheap pre-check: `false` means the cell definitely holds no resource.
    pub fn might_have_resource(&self, cell: Cell) -> bool {
        self.resource_filter.might_contain(&cell.key())
    }

    pub fn resource_at(&self, cell: Cell) -> Option<&ResourceRecord> {
        let key = cell.key();
        if !self.resource_filter.might_contain(&key) {
            return None;
        }
        self.resources_by_position.get(&key)
    }

    /// Collect up to `amount` units from the cell. The record is dropped
    /// once its quantity reaches zero. Returns what was collected.
    pub fn take_resource(
        &mut self,
        cell: Cell,
        amount: u32,
    ) -> Result<Option<ResourceRecord>, IndexError> {
        self.bounds.check(cell)?;
        let key = cell.key();
        let Some(record) = self.resources_by_position.get_mut(&key) else {
            return Ok(None);
        };

        let taken = amount.min(record.quantity);
        record.quantity -= taken;
        let kind = record.kind;
        let remaining = record.quantity;
        if remaining == 0 {
            self.resources_by_position.remove(&key);
        }
        if let Some(&slot) = self.nodes_by_position.get(&key) {
            self.nodes[slot].stock = (remaining > 0).then_some(Stock {
                kind,
                quantity: remaining,
            });
        }

        tracing::debug!(
            target: "rescue_sim::grid",
            cell = %cell,
            kind = ?kind,
            taken,
            remaining,
            "grid.resource_taken"
        );
        Ok(Some(ResourceRecord::new(cell, kind, taken)))
    }

    /// Closest resource of `kind` by squared distance; ties go to the lower
    /// row, then the lower column.
    pub fn nearest_resource(&self, from: Cell, kind: ResourceKind) -> Option<Cell> {
        self.resources_by_position
            .values()
            .filter(|record| record.kind == kind)
            .min_by_key(|record| (from.distance_sq(record.cell), record.cell.row, record.cell.col))
            .map(|record| record.cell)
    }

    pub fn resources(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.resources_by_position.values()
    }

    pub fn resource_count(&self) -> usize {
        self.resources_by_position.len()
    }

    pub fn node(&self, cell: Cell) -> Option<&Node> {
        let slot = self.nodes_by_position.get(&cell.key())?;
        self.nodes.get(*slot)
    }

    /// Row-major node array.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn is_traversable(&self, cell: Cell) -> bool {
        self.node(cell).is_some_and(Node::is_traversable)
    }

    /// In-bounds 4-connected neighbors: up, down, left, right.
    pub fn neighbors(&self, cell: Cell) -> Vec<Cell> {
        if !self.bounds.contains(cell) {
            return Vec::new();
        }
        [(-1, 0), (1, 0), (0, -1), (0, 1)]
            .into_iter()
            .filter_map(|(dr, dc)| cell.offset(dr, dc))
            .filter(|n| self.bounds.contains(*n))
            .collect()
    }

    pub fn bounds(&self) -> GridBounds {
        self.bounds
    }

    // ------------------------------------------------------------------
    // Occupants
    // ------------------------------------------------------------------

    fn check_collision(&self, id: OccupantId, team: Team, dest: Cell) -> Result<(), IndexError> {
        let blocker = self
            .occupants_by_position
            .query(dest.key())
            .iter()
            .filter_map(|other| self.occupants.get(other))
            .find(|other| other.id != id && other.team == team.opponent());

        match blocker {
            Some(other) => Err(IndexError::Collision {
                cell: dest,
                occupant: other.id,
                team: other.team,
            }),
            None => Ok(()),
        }
    }

    /// Move an occupant to `dest`, registering it if unknown.
    ///
    /// Returns the previous cell, `None` for a newly registered occupant.
    /// An occupant keeps the team it was registered with; placing it under
    /// the other team is a `TeamMismatch`. Fails without touching any index
    /// when `dest` is out of bounds or held by the other team.
    pub fn place_occupant(
        &mut self,
        id: OccupantId,
        team: Team,
        dest: Cell,
    ) -> Result<Option<Cell>, IndexError> {
        self.bounds.check(dest)?;
        if let Some(registered) = self.occupants.get(&id).map(|o| o.team) {
            if registered != team {
                return Err(IndexError::TeamMismatch {
                    occupant: id,
                    registered,
                });
            }
        }
        if let Err(err) = self.check_collision(id, team, dest) {
            tracing::warn!(
                target: "rescue_sim::grid",
                occupant = id.0,
                team = %team,
                cell = %dest,
                error = %err,
                "grid.occupant_collision"
            );
            return Err(err);
        }

        let arrival = self.next_arrival;
        let previous = match self.occupants.get_mut(&id) {
            Some(occupant) => {
                let previous = occupant.cell;
                if previous != dest {
                    self.occupants_by_position.remove(previous.key(), id);
                    self.occupants_by_position.insert(dest.key(), id);
                    occupant.cell = dest;
                    occupant.arrival = arrival;
                    self.next_arrival += 1;
                }
                Some(previous)
            }
            None => {
                let mut occupant = Occupant::new(id, team, dest);
                occupant.arrival = arrival;
                self.occupants.insert(occupant)?;
                self.occupants_by_position.insert(dest.key(), id);
                self.next_arrival += 1;
                None
            }
        };

        tracing::debug!(
            target: "rescue_sim::grid",
            occupant = id.0,
            to = %dest,
            "grid.occupant_placed"
        );
        Ok(previous)
    }

    pub fn remove_occupant(&mut self, id: OccupantId) -> Result<Occupant, IndexError> {
        let occupant = self.occupants.take(&id).ok_or(IndexError::NotFound {
            kind: Occupant::KIND,
            id: id.0,
        })?;
        self.occupants_by_position.remove(occupant.cell.key(), id);
        tracing::debug!(target: "rescue_sim::grid", occupant = id.0, "grid.occupant_removed");
        Ok(occupant)
    }

    pub fn occupant(&self, id: OccupantId) -> Option<&Occupant> {
        self.occupants.get(&id)
    }

    /// Ids at the cell, in arrival order.
    pub fn occupants_at(&self, cell: Cell) -> &[OccupantId] {
        self.occupants_by_position.query(cell.key())
    }

    pub fn occupants(&self) -> impl Iterator<Item = &Occupant> {
        self.occupants.iter()
    }

    pub fn occupant_count(&self) -> usize {
        self.occupants.len()
    }
}
