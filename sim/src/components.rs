//! Data types for the rescue simulation.
//!
//! Plain serializable records. The coordinators in `hazards` and `grid` own
//! the canonical collections of these and keep their indices in sync.

use crate::error::IndexError;
use crate::hashing::{cell_key, CellKey};
use crate::identity::HasId;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// GRID COORDINATES
// ============================================================================

/// A grid cell, row-major. Ordering is by row, then column.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Cell {
    pub row: u32,
    pub col: u32,
}

impl Cell {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Pairing-function key of this cell.
    #[inline]
    pub fn key(&self) -> CellKey {
        cell_key(self.row, self.col)
    }

    /// Squared Euclidean distance, no square root.
    #[inline]
    pub fn distance_sq(&self, other: Cell) -> u64 {
        let dr = self.row.abs_diff(other.row) as u64;
        let dc = self.col.abs_diff(other.col) as u64;
        dr * dr + dc * dc
    }

    /// Cell offset by a signed delta, if it stays non-negative.
    pub fn offset(&self, dr: i64, dc: i64) -> Option<Cell> {
        let row = u32::try_from(self.row as i64 + dr).ok()?;
        let col = u32::try_from(self.col as i64 + dc).ok()?;
        Some(Cell { row, col })
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl From<(u32, u32)> for Cell {
    fn from((row, col): (u32, u32)) -> Self {
        Self { row, col }
    }
}

/// Extent of the simulation grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridBounds {
    pub rows: u32,
    pub cols: u32,
}

impl GridBounds {
    pub const fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }

    /// Reject cells outside the grid before any index is touched.
    pub fn check(&self, cell: Cell) -> Result<(), IndexError> {
        if self.contains(cell) {
            Ok(())
        } else {
            Err(IndexError::OutOfBounds {
                row: cell.row,
                col: cell.col,
                rows: self.rows,
                cols: self.cols,
            })
        }
    }

    pub fn cell_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// All cells, row-major.
    pub fn cells(&self) -> impl Iterator<Item = Cell> {
        let cols = self.cols;
        (0..self.rows).flat_map(move |row| (0..cols).map(move |col| Cell::new(row, col)))
    }
}

// ============================================================================
// TEAMS & OCCUPANTS
// ============================================================================

/// The two competing rescue teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    Player1,
    Player2,
}

impl Team {
    pub fn opponent(&self) -> Team {
        match self {
            Team::Player1 => Team::Player2,
            Team::Player2 => Team::Player1,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::Player1 => f.write_str("player1"),
            Team::Player2 => f.write_str("player2"),
        }
    }
}

/// Unique identifier for a vehicle on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OccupantId(pub u32);

impl From<OccupantId> for u32 {
    fn from(id: OccupantId) -> u32 {
        id.0
    }
}

impl fmt::Display for OccupantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A mobile unit (vehicle) standing on a cell.
///
/// Several occupants of the same team may share a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub id: OccupantId,
    pub team: Team,
    pub cell: Cell,
    /// Order in which the occupant entered its current cell.
    #[serde(default)]
    pub arrival: u64,
}

impl Occupant {
    pub fn new(id: OccupantId, team: Team, cell: Cell) -> Self {
        Self {
            id,
            team,
            cell,
            arrival: 0,
        }
    }
}

impl HasId for Occupant {
    type Id = OccupantId;
    const KIND: &'static str = "occupant";

    fn id(&self) -> OccupantId {
        self.id
    }
}

// ============================================================================
// RESOURCES
// ============================================================================

/// Kinds of collectible resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Stranded person.
    Person,
    Clothing,
    Food,
    Medicine,
    Weapons,
}

impl ResourceKind {
    /// Score awarded per collected unit.
    pub fn points(&self) -> u32 {
        match self {
            ResourceKind::Person => 50,
            ResourceKind::Clothing => 5,
            ResourceKind::Food => 10,
            ResourceKind::Medicine => 20,
            ResourceKind::Weapons => 50,
        }
    }

    /// Supplies other than people.
    pub const GOODS: [ResourceKind; 4] = [
        ResourceKind::Clothing,
        ResourceKind::Food,
        ResourceKind::Medicine,
        ResourceKind::Weapons,
    ];
}

/// What a node holds: a kind and a remaining quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    pub kind: ResourceKind,
    pub quantity: u32,
}

/// Resource present at a cell. At most one per cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub cell: Cell,
    pub kind: ResourceKind,
    pub quantity: u32,
}

impl ResourceRecord {
    pub fn new(cell: Cell, kind: ResourceKind, quantity: u32) -> Self {
        Self {
            cell,
            kind,
            quantity,
        }
    }

    pub fn value(&self) -> u32 {
        self.kind.points() * self.quantity
    }
}

// ============================================================================
// NODES
// ============================================================================

/// Traversability of a cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terrain {
    #[default]
    Open,
    Blocked,
    /// A team's home base.
    Base(Team),
}

/// One grid cell of the map graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub cell: Cell,
    pub terrain: Terrain,
    pub stock: Option<Stock>,
}

impl Node {
    pub fn new(cell: Cell) -> Self {
        Self {
            cell,
            terrain: Terrain::Open,
            stock: None,
        }
    }

    pub fn is_traversable(&self) -> bool {
        !matches!(self.terrain, Terrain::Blocked)
    }

    pub fn is_empty(&self) -> bool {
        self.terrain == Terrain::Open && self.stock.is_none()
    }

    pub fn has_person(&self) -> bool {
        matches!(self.stock, Some(Stock { kind: ResourceKind::Person, .. }))
    }

    pub fn resource(&self) -> Option<ResourceRecord> {
        self.stock
            .map(|stock| ResourceRecord::new(self.cell, stock.kind, stock.quantity))
    }

    pub fn state(&self) -> NodeState {
        match (self.terrain, self.stock) {
            (Terrain::Open, Some(stock)) => NodeState::Resource {
                kind: stock.kind,
                quantity: stock.quantity,
            },
            (Terrain::Open, None) => NodeState::Empty,
            (Terrain::Blocked, _) => NodeState::Blocked,
            (Terrain::Base(team), _) => NodeState::Base(team),
        }
    }
}

/// New state for a node, applied by `GridPositionIndex::set_node_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    Empty,
    Blocked,
    Base(Team),
    /// Open ground holding a resource. A zero quantity is the same as `Empty`.
    Resource { kind: ResourceKind, quantity: u32 },
}

// ============================================================================
// HAZARDS
// ============================================================================

/// Unique identifier for a hazard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HazardId(pub u32);

impl From<HazardId> for u32 {
    fn from(id: HazardId) -> u32 {
        id.0
    }
}

impl fmt::Display for HazardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Horizontal band half-length in columns.
pub const HORIZONTAL_BAND_HALF_LENGTH: u32 = 7;
/// Vertical band half-length in rows.
pub const VERTICAL_BAND_HALF_LENGTH: u32 = 5;
/// Largest row or column extent of any hazard kind.
pub const MAX_HAZARD_REACH: u32 = HORIZONTAL_BAND_HALF_LENGTH;

/// Mine types placed on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HazardKind {
    /// Static disc of radius 3.
    LargeCircle,
    /// Static disc of radius 2.
    SmallCircle,
    /// Static single-row band, 15 cells wide.
    HorizontalBand,
    /// Static single-column band, 11 cells tall.
    VerticalBand,
    /// Disc of radius 2 that switches on and off every few ticks and moves
    /// each time it switches back on.
    Pulsing,
    /// Static, covers its center cell only.
    Point,
}

impl HazardKind {
    pub const ALL: [HazardKind; 6] = [
        HazardKind::LargeCircle,
        HazardKind::SmallCircle,
        HazardKind::HorizontalBand,
        HazardKind::VerticalBand,
        HazardKind::Pulsing,
        HazardKind::Point,
    ];

    /// Ticks between on/off switches of a pulsing hazard.
    pub const PULSE_PERIOD: u64 = 5;

    /// (row, col) reach from the center.
    pub fn extent(&self) -> (u32, u32) {
        match self {
            HazardKind::LargeCircle => (3, 3),
            HazardKind::SmallCircle | HazardKind::Pulsing => (2, 2),
            HazardKind::HorizontalBand => (0, HORIZONTAL_BAND_HALF_LENGTH),
            HazardKind::VerticalBand => (VERTICAL_BAND_HALF_LENGTH, 0),
            HazardKind::Point => (0, 0),
        }
    }

    pub fn reach(&self) -> u32 {
        let (r, c) = self.extent();
        r.max(c)
    }

    pub fn mobility(&self) -> Mobility {
        match self {
            HazardKind::Pulsing => Mobility::Relocating,
            _ => Mobility::Static,
        }
    }

    pub fn default_activation(&self) -> Activation {
        match self {
            HazardKind::Pulsing => Activation::Periodic {
                period: Self::PULSE_PERIOD,
                phase: 0,
            },
            _ => Activation::Always,
        }
    }

    /// Geometric shape of the area of effect around `center`.
    pub fn shape_at(&self, center: Cell) -> Shape {
        let (r, c) = (center.row as i64, center.col as i64);
        match self {
            HazardKind::LargeCircle
            | HazardKind::SmallCircle
            | HazardKind::Pulsing
            | HazardKind::Point => {
                Shape::Disc {
                    row: r,
                    col: c,
                    radius: self.reach() as i64,
                }
            }
            HazardKind::HorizontalBand | HazardKind::VerticalBand => {
                let (er, ec) = self.extent();
                Shape::Rect {
                    min_row: r - er as i64,
                    max_row: r + er as i64,
                    min_col: c - ec as i64,
                    max_col: c + ec as i64,
                }
            }
        }
    }
}

/// Area of effect in signed grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Disc { row: i64, col: i64, radius: i64 },
    Rect { min_row: i64, max_row: i64, min_col: i64, max_col: i64 },
}

impl Shape {
    pub fn covers(&self, cell: Cell) -> bool {
        let (r, c) = (cell.row as i64, cell.col as i64);
        match *self {
            Shape::Disc { row, col, radius } => {
                let (dr, dc) = (r - row, c - col);
                dr * dr + dc * dc <= radius * radius
            }
            Shape::Rect { min_row, max_row, min_col, max_col } => {
                (min_row..=max_row).contains(&r) && (min_col..=max_col).contains(&c)
            }
        }
    }

    /// Inclusive bounding box `(min_row, max_row, min_col, max_col)`.
    pub fn bounding_box(&self) -> (i64, i64, i64, i64) {
        match *self {
            Shape::Disc { row, col, radius } => {
                (row - radius, row + radius, col - radius, col + radius)
            }
            Shape::Rect { min_row, max_row, min_col, max_col } => {
                (min_row, max_row, min_col, max_col)
            }
        }
    }

    pub fn overlaps(&self, other: &Shape) -> bool {
        match (*self, *other) {
            (Shape::Disc { row: ar, col: ac, radius: ra }, Shape::Disc { row: br, col: bc, radius: rb }) => {
                let (dr, dc) = (ar - br, ac - bc);
                dr * dr + dc * dc <= (ra + rb) * (ra + rb)
            }
            (Shape::Disc { row, col, radius }, rect @ Shape::Rect { .. })
            | (rect @ Shape::Rect { .. }, Shape::Disc { row, col, radius }) => {
                // Closest point of the rectangle to the disc center.
                let (min_row, max_row, min_col, max_col) = rect.bounding_box();
                let nr = row.clamp(min_row, max_row);
                let nc = col.clamp(min_col, max_col);
                let (dr, dc) = (row - nr, col - nc);
                dr * dr + dc * dc <= radius * radius
            }
            (a @ Shape::Rect { .. }, b @ Shape::Rect { .. }) => {
                let (a_r0, a_r1, a_c0, a_c1) = a.bounding_box();
                let (b_r0, b_r1, b_c0, b_c1) = b.bounding_box();
                a_r0 <= b_r1 && b_r0 <= a_r1 && a_c0 <= b_c1 && b_c0 <= a_c1
            }
        }
    }
}

/// When a hazard is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Always,
    /// Active for `from <= tick < until`.
    Window { from: u64, until: u64 },
    /// Active while `(tick + phase) / period` is even, so it starts armed at
    /// tick 0 (phase 0) and flips every `period` ticks.
    Periodic { period: u64, phase: u64 },
}

impl Activation {
    pub fn is_active(&self, tick: u64) -> bool {
        match *self {
            Activation::Always => true,
            Activation::Window { from, until } => from <= tick && tick < until,
            Activation::Periodic { period, phase } => {
                period == 0 || (tick.wrapping_add(phase) / period) % 2 == 0
            }
        }
    }

    /// Whether the hazard switches from disarmed to armed exactly at `tick`.
    pub fn reopens_at(&self, tick: u64) -> bool {
        tick > 0 && self.is_active(tick) && !self.is_active(tick - 1)
    }
}

/// Whether a hazard stays put or moves around the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mobility {
    Static,
    Relocating,
}

/// A mine on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hazard {
    pub id: HazardId,
    pub kind: HazardKind,
    pub center: Cell,
    pub activation: Activation,
    pub mobility: Mobility,
}

impl Hazard {
    /// Hazard with the default activation and mobility of its kind.
    pub fn new(id: HazardId, kind: HazardKind, center: Cell) -> Self {
        Self {
            id,
            kind,
            center,
            activation: kind.default_activation(),
            mobility: kind.mobility(),
        }
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    #[inline]
    pub fn is_active_at(&self, tick: u64) -> bool {
        self.activation.is_active(tick)
    }

    pub fn shape(&self) -> Shape {
        self.kind.shape_at(self.center)
    }

    /// Cells covered by this hazard, clipped to the grid, row-major.
    ///
    /// Never empty for an in-bounds center: every shape covers its center.
    pub fn footprint(&self, bounds: GridBounds) -> Vec<Cell> {
        let shape = self.shape();
        let (min_row, max_row, min_col, max_col) = shape.bounding_box();
        let row_range = min_row.max(0)..=max_row.min(bounds.rows as i64 - 1);
        let col_range = min_col.max(0)..=max_col.min(bounds.cols as i64 - 1);

        let mut cells = Vec::new();
        for row in row_range {
            for col in col_range.clone() {
                let cell = Cell::new(row as u32, col as u32);
                if shape.covers(cell) {
                    cells.push(cell);
                }
            }
        }
        cells
    }
}
