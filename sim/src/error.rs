//! Error taxonomy shared by the index structures and their coordinators.

use crate::components::{Cell, OccupantId, Team};
use thiserror::Error;

/// Contract violations raised by index mutations.
///
/// "Nothing found" is never an error for queries; those return an empty
/// result or `None`. Lower-level removals are idempotent and silent, only the
/// coordinators report `NotFound`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("{kind} {id} is already registered")]
    DuplicateId { kind: &'static str, id: u32 },
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u32 },
    #[error("cell ({row}, {col}) is outside the {rows}x{cols} grid")]
    OutOfBounds {
        row: u32,
        col: u32,
        rows: u32,
        cols: u32,
    },
    #[error("cell {cell} is held by {team} occupant {occupant}")]
    Collision {
        cell: Cell,
        occupant: OccupantId,
        team: Team,
    },
    #[error("occupant {occupant} is registered to {registered}")]
    TeamMismatch {
        occupant: OccupantId,
        registered: Team,
    },
}
