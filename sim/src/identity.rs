//! Id-keyed entity store.

use crate::error::IndexError;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// An entity with a stable identity.
pub trait HasId {
    type Id: Copy + Eq + Hash + fmt::Debug + Into<u32>;

    /// Entity kind used in error messages and logs ("hazard", "occupant").
    const KIND: &'static str;

    fn id(&self) -> Self::Id;
}

/// O(1) average id -> entity lookup.
///
/// Inserting an id that is already present is rejected. Removal of an absent
/// id is a silent no-op so callers can clean up without checking first.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityIndex<T: HasId> {
    entries: HashMap<T::Id, T>,
}

impl<T: HasId> Default for IdentityIndex<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T: HasId> IdentityIndex<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: T) -> Result<(), IndexError> {
        let id = entity.id();
        if self.entries.contains_key(&id) {
            return Err(IndexError::DuplicateId {
                kind: T::KIND,
                id: id.into(),
            });
        }
        self.entries.insert(id, entity);
        Ok(())
    }

    /// Returns whether an entry was actually removed.
    pub fn remove(&mut self, id: &T::Id) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Remove and return the entry, if any.
    pub fn take(&mut self, id: &T::Id) -> Option<T> {
        self.entries.remove(id)
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &T::Id) -> Option<&mut T> {
        self.entries.get_mut(id)
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.values_mut()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Cell, Occupant, OccupantId, Team};

    fn occupant(id: u32) -> Occupant {
        Occupant::new(OccupantId(id), Team::Player1, Cell::new(0, 0))
    }

    #[test]
    fn test_insert_and_get() {
        let mut index = IdentityIndex::new();
        index.insert(occupant(1)).unwrap();
        index.insert(occupant(2)).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.get(&OccupantId(2)).map(|o| o.id), Some(OccupantId(2)));
        assert!(index.get(&OccupantId(3)).is_none());
    }

    #[test]
    fn test_duplicate_id_rejected_without_overwrite() {
        let mut index = IdentityIndex::new();
        index.insert(occupant(1)).unwrap();

        let mut moved = occupant(1);
        moved.cell = Cell::new(4, 4);
        let err = index.insert(moved).unwrap_err();

        assert_eq!(err, IndexError::DuplicateId { kind: "occupant", id: 1 });
        assert_eq!(index.get(&OccupantId(1)).map(|o| o.cell), Some(Cell::new(0, 0)));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut index = IdentityIndex::new();
        index.insert(occupant(9)).unwrap();

        assert!(index.remove(&OccupantId(9)));
        assert!(!index.remove(&OccupantId(9)));
        assert!(index.is_empty());
    }
}
