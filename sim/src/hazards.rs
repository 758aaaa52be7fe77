//! Hazard coordinator.
//!
//! Owns the canonical hazard list and keeps three derived indices in step
//! with it:
//!
//! - an identity index from `HazardId` to the hazard's slot and footprint,
//! - a cell cache listing which hazards cover each cell,
//! - a spatial hash table of hazard centers for proximity and overlap checks.
//!
//! Every mutation updates all of them before returning.

use std::ops::RangeInclusive;

use bevy_ecs::prelude::Resource;
use rand::Rng;

use crate::components::{Cell, GridBounds, Hazard, HazardId, HazardKind, Mobility, MAX_HAZARD_REACH};
use crate::error::IndexError;
use crate::identity::{HasId, IdentityIndex};
use crate::spatial::SpatialHashTable;
use crate::spatial_cache::SpatialCache;

/// Lifecycle of a hazard at a given tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardState {
    /// Registered but outside its activation window.
    Inactive,
    Active,
    /// Re-armed this tick and due to move.
    Relocating,
    /// Not registered.
    Removed,
}

#[derive(Debug, Clone, PartialEq)]
struct HazardSlot {
    id: HazardId,
    /// Position in the canonical list.
    slot: usize,
    /// Footprint at the current center, row-major.
    cells: Vec<Cell>,
}

impl HasId for HazardSlot {
    type Id = HazardId;
    const KIND: &'static str = "hazard";

    fn id(&self) -> HazardId {
        self.id
    }
}

/// Canonical hazard list plus its derived lookup structures.
#[derive(Resource, Debug, Clone)]
pub struct HazardIndex {
    bounds: GridBounds,
    hazards: Vec<Hazard>,
    by_id: IdentityIndex<HazardSlot>,
    by_cell: SpatialCache<HazardId>,
    centers: SpatialHashTable<HazardId>,
    next_id: u32,
}

impl PartialEq for HazardIndex {
    fn eq(&self, other: &Self) -> bool {
        self.bounds == other.bounds
            && self.hazards == other.hazards
            && self.by_id == other.by_id
            && self.by_cell == other.by_cell
            && self.centers == other.centers
    }
}

impl HazardIndex {
    pub fn new(bounds: GridBounds, bucket_width: u32) -> Self {
        Self {
            bounds,
            hazards: Vec::new(),
            by_id: IdentityIndex::new(),
            by_cell: SpatialCache::new(),
            centers: SpatialHashTable::new(bucket_width),
            next_id: 1,
        }
    }

    /// Rebuild every index from a canonical hazard list.
    ///
    /// Hazards are registered in list order, which reproduces the bucket
    /// order an incrementally maintained index would have.
    pub fn from_hazards(
        bounds: GridBounds,
        bucket_width: u32,
        hazards: Vec<Hazard>,
    ) -> Result<Self, IndexError> {
        let mut index = Self::new(bounds, bucket_width);
        index.rebuild(hazards)?;
        Ok(index)
    }

    /// Replace every entry with `hazards`, registered from scratch.
    ///
    /// The new indices are built aside; on error `self` is left as it was.
    pub fn rebuild(&mut self, hazards: Vec<Hazard>) -> Result<(), IndexError> {
        let mut fresh = Self::new(self.bounds, self.centers.width());
        for hazard in &hazards {
            fresh.bounds.check(hazard.center)?;
        }
        let footprints = compute_footprints(fresh.bounds, &hazards);
        for (hazard, cells) in hazards.into_iter().zip(footprints) {
            fresh.attach(hazard, cells)?;
        }
        *self = fresh;

        tracing::info!(
            target: "rescue_sim::hazards",
            hazards = self.hazards.len(),
            covered_cells = self.by_cell.bucket_count(),
            "hazards.rebuilt"
        );
        Ok(())
    }

    /// Register a hazard under its own id.
    pub fn add_hazard(&mut self, hazard: Hazard) -> Result<(), IndexError> {
        self.bounds.check(hazard.center)?;
        let cells = hazard.footprint(self.bounds);
        if let Err(err) = self.attach(hazard, cells) {
            tracing::warn!(
                target: "rescue_sim::hazards",
                id = hazard.id.0,
                error = %err,
                "hazards.add_rejected"
            );
            return Err(err);
        }

        tracing::debug!(
            target: "rescue_sim::hazards",
            id = hazard.id.0,
            kind = ?hazard.kind,
            center = %hazard.center,
            "hazards.added"
        );
        Ok(())
    }

    /// Register a new hazard with the next free id.
    pub fn spawn(&mut self, kind: HazardKind, center: Cell) -> Result<HazardId, IndexError> {
        let id = HazardId(self.next_id);
        self.add_hazard(Hazard::new(id, kind, center))?;
        Ok(id)
    }

    pub fn remove_hazard(&mut self, id: HazardId) -> Result<Hazard, IndexError> {
        let (hazard, _) = self.detach(id).ok_or(IndexError::NotFound {
            kind: HazardSlot::KIND,
            id: id.0,
        })?;
        tracing::debug!(target: "rescue_sim::hazards", id = id.0, "hazards.removed");
        Ok(hazard)
    }

    /// Move a hazard's center. Returns the previous center.
    ///
    /// The hazard moves to the end of the canonical list, matching its new
    /// position at the tail of every bucket it now covers.
    pub fn relocate(&mut self, id: HazardId, new_center: Cell) -> Result<Cell, IndexError> {
        if !self.by_id.contains(&id) {
            return Err(IndexError::NotFound {
                kind: HazardSlot::KIND,
                id: id.0,
            });
        }
        self.bounds.check(new_center)?;

        let Some((mut hazard, _)) = self.detach(id) else {
            return Err(IndexError::NotFound {
                kind: HazardSlot::KIND,
                id: id.0,
            });
        };
        let previous = hazard.center;
        hazard.center = new_center;
        let cells = hazard.footprint(self.bounds);
        self.attach(hazard, cells)?;

        tracing::debug!(
            target: "rescue_sim::hazards",
            id = id.0,
            from = %previous,
            to = %new_center,
            "hazards.relocated"
        );
        Ok(previous)
    }

    fn attach(&mut self, hazard: Hazard, cells: Vec<Cell>) -> Result<(), IndexError> {
        let id = hazard.id;
        self.by_id.insert(HazardSlot {
            id,
            slot: self.hazards.len(),
            cells,
        })?;
        if let Some(entry) = self.by_id.get(&id) {
            for cell in &entry.cells {
                self.by_cell.insert(cell.key(), id);
            }
        }
        self.centers.insert_at(&hazard.center, id);
        self.hazards.push(hazard);
        self.next_id = self.next_id.max(id.0.saturating_add(1));
        Ok(())
    }

    fn detach(&mut self, id: HazardId) -> Option<(Hazard, Vec<Cell>)> {
        let entry = self.by_id.take(&id)?;
        let hazard = self.hazards.remove(entry.slot);
        for other in self.by_id.iter_mut() {
            if other.slot > entry.slot {
                other.slot -= 1;
            }
        }
        for cell in &entry.cells {
            self.by_cell.remove(cell.key(), id);
        }
        let (row, col) = (hazard.center.row as i32, hazard.center.col as i32);
        self.centers.remove(row, col, &id);
        Some((hazard, entry.cells))
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn bounds(&self) -> GridBounds {
        self.bounds
    }

    pub fn get(&self, id: HazardId) -> Option<&Hazard> {
        let entry = self.by_id.get(&id)?;
        self.hazards.get(entry.slot)
    }

    pub fn contains(&self, id: HazardId) -> bool {
        self.by_id.contains(&id)
    }

    /// Canonical hazard list, in registration order.
    pub fn hazards(&self) -> &[Hazard] {
        &self.hazards
    }

    pub fn len(&self) -> usize {
        self.hazards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hazards.is_empty()
    }

    /// Cells covered by a hazard at its current center.
    pub fn cells_of(&self, id: HazardId) -> &[Cell] {
        self.by_id
            .get(&id)
            .map(|entry| entry.cells.as_slice())
            .unwrap_or(&[])
    }

    /// Ids covering a cell regardless of activation, in bucket order.
    pub fn ids_at(&self, cell: Cell) -> &[HazardId] {
        self.by_cell.query(cell.key())
    }

    /// Whether any hazard active at `tick` covers the cell.
    pub fn is_cell_hazardous(&self, cell: Cell, tick: u64) -> bool {
        self.ids_at(cell)
            .iter()
            .filter_map(|id| self.get(*id))
            .any(|hazard| hazard.is_active_at(tick))
    }

    /// Hazards active at `tick` that cover the cell, in bucket insertion order.
    pub fn hazards_affecting(&self, cell: Cell, tick: u64) -> Vec<&Hazard> {
        self.ids_at(cell)
            .iter()
            .filter_map(|id| self.get(*id))
            .filter(|hazard| hazard.is_active_at(tick))
            .collect()
    }

    /// Whether any hazard covers the cell, armed or not.
    pub fn is_cell_claimed(&self, cell: Cell) -> bool {
        self.by_cell.is_occupied(cell.key())
    }

    pub fn hazard_state(&self, id: HazardId, tick: u64) -> HazardState {
        let Some(hazard) = self.get(id) else {
            return HazardState::Removed;
        };
        if hazard.mobility == Mobility::Relocating && hazard.activation.reopens_at(tick) {
            HazardState::Relocating
        } else if hazard.is_active_at(tick) {
            HazardState::Active
        } else {
            HazardState::Inactive
        }
    }

    /// Hazards whose center lies within `radius` of the cell, closest first.
    pub fn hazards_near(&self, cell: Cell, radius: u32) -> Vec<HazardId> {
        self.centers
            .query_around(&cell, radius)
            .into_iter()
            .map(|entry| entry.item)
            .collect()
    }

    /// Whether a hazard of `kind` centered at `center` would overlap any
    /// registered hazard other than `ignore`.
    pub fn overlaps_any(&self, kind: HazardKind, center: Cell, ignore: Option<HazardId>) -> bool {
        let shape = kind.shape_at(center);
        // Overlapping shapes have centers at most the sum of their reaches apart.
        self.hazards_near(center, kind.reach() + MAX_HAZARD_REACH)
            .into_iter()
            .filter(|id| Some(*id) != ignore)
            .filter_map(|id| self.get(id))
            .any(|other| shape.overlaps(&other.shape()))
    }

    /// Rows and columns a center of `kind` may take so that its extent stays
    /// `margin` cells away from the grid edge. Collapses to a single value on
    /// grids too small for the margin.
    pub fn center_range(
        kind: HazardKind,
        bounds: GridBounds,
        margin: u32,
    ) -> (RangeInclusive<u32>, RangeInclusive<u32>) {
        let (row_reach, col_reach) = kind.extent();
        let axis = |reach: u32, len: u32| {
            let last = len.saturating_sub(1);
            let lo = (reach + margin).min(last);
            let hi = last.saturating_sub(reach + margin).max(lo);
            lo..=hi
        };
        (axis(row_reach, bounds.rows), axis(col_reach, bounds.cols))
    }

    /// Sample up to `attempts` centers for `kind` that overlap no hazard other
    /// than `ignore` and whose footprint avoids every `blocked` cell.
    pub fn find_free_center<R: Rng + ?Sized>(
        &self,
        kind: HazardKind,
        ignore: Option<HazardId>,
        rng: &mut R,
        margin: u32,
        attempts: u32,
        blocked: impl Fn(Cell) -> bool,
    ) -> Option<Cell> {
        let (rows, cols) = Self::center_range(kind, self.bounds, margin);
        for _ in 0..attempts {
            let center = Cell::new(rng.gen_range(rows.clone()), rng.gen_range(cols.clone()));
            if self.overlaps_any(kind, center, ignore) {
                continue;
            }
            let probe = Hazard::new(HazardId(0), kind, center);
            if probe.footprint(self.bounds).into_iter().any(&blocked) {
                continue;
            }
            return Some(center);
        }
        None
    }

    /// Pick a new center for a registered hazard. `None` if the hazard is
    /// unknown or no target was found.
    pub fn find_relocation_target<R: Rng + ?Sized>(
        &self,
        id: HazardId,
        rng: &mut R,
        margin: u32,
        attempts: u32,
        blocked: impl Fn(Cell) -> bool,
    ) -> Option<Cell> {
        let kind = self.get(id)?.kind;
        self.find_free_center(kind, Some(id), rng, margin, attempts, blocked)
    }

    /// Ids of relocating hazards due to move at `tick`, in canonical order.
    pub fn due_for_relocation(&self, tick: u64) -> Vec<HazardId> {
        self.hazards
            .iter()
            .filter(|h| h.mobility == Mobility::Relocating && h.activation.reopens_at(tick))
            .map(|h| h.id)
            .collect()
    }
}

#[cfg(feature = "parallel")]
fn compute_footprints(bounds: GridBounds, hazards: &[Hazard]) -> Vec<Vec<Cell>> {
    use rayon::prelude::*;
    hazards.par_iter().map(|h| h.footprint(bounds)).collect()
}

#[cfg(not(feature = "parallel"))]
fn compute_footprints(bounds: GridBounds, hazards: &[Hazard]) -> Vec<Vec<Cell>> {
    hazards.iter().map(|h| h.footprint(bounds)).collect()
}
