//! Cell-keyed id buckets.

use crate::bucket::BucketMap;
use crate::hashing::CellKey;

/// Which entity ids occupy or affect each cell.
///
/// Buckets are expected to stay short (a handful of ids per cell), so removal
/// is a linear scan of one bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialCache<I> {
    cells: BucketMap<CellKey, I>,
}

impl<I> Default for SpatialCache<I> {
    fn default() -> Self {
        Self {
            cells: BucketMap::new(),
        }
    }
}

impl<I: Copy + Eq> SpatialCache<I> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cell: CellKey, id: I) {
        self.cells.push(cell, id);
    }

    /// Remove the first occurrence of `id` in the cell's bucket. No-op if absent.
    pub fn remove(&mut self, cell: CellKey, id: I) -> bool {
        self.cells.remove_first(&cell, |v| *v == id).is_some()
    }

    /// Ids in the cell, in insertion order. Empty for an unoccupied cell.
    pub fn query(&self, cell: CellKey) -> &[I] {
        self.cells.get(&cell)
    }

    pub fn is_occupied(&self, cell: CellKey) -> bool {
        self.cells.contains_key(&cell)
    }

    pub fn bucket_count(&self) -> usize {
        self.cells.bucket_count()
    }

    pub fn entry_count(&self) -> usize {
        self.cells.entry_count()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellKey, &[I])> {
        self.cells.iter().map(|(key, ids)| (*key, ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::cell_key;

    #[test]
    fn test_chaining_keeps_insertion_order() {
        let mut cache = SpatialCache::new();
        let cell = cell_key(2, 2);
        cache.insert(cell, 3u32);
        cache.insert(cell, 1u32);
        cache.insert(cell, 2u32);

        assert_eq!(cache.query(cell), &[3, 1, 2]);
    }

    #[test]
    fn test_last_removal_drops_bucket() {
        let mut cache = SpatialCache::new();
        let cell = cell_key(0, 4);
        cache.insert(cell, 5u32);
        cache.insert(cell, 6u32);

        assert!(cache.remove(cell, 5));
        assert!(cache.is_occupied(cell));
        assert!(cache.remove(cell, 6));
        assert!(!cache.is_occupied(cell));
        assert_eq!(cache.bucket_count(), 0);
    }

    #[test]
    fn test_unoccupied_query_and_removal() {
        let mut cache: SpatialCache<u32> = SpatialCache::new();
        assert!(cache.query(cell_key(1, 1)).is_empty());
        assert!(!cache.remove(cell_key(1, 1), 7));
    }
}
