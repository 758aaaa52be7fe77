//! Spatial hashing for proximity queries over arbitrary positioned objects.
//!
//! Provides O(1) insertion and O(k) cell and radius queries, where k is the
//! number of objects in the buckets overlapping the query, rather than O(n)
//! for brute force. The bucket width is independent of the simulation grid.

use crate::bucket::BucketMap;
use crate::components::{Cell, Hazard, Occupant, ResourceRecord};

/// Anything that sits at a signed (row, col) position.
pub trait HasPosition {
    fn position(&self) -> (i32, i32);
}

impl HasPosition for Cell {
    fn position(&self) -> (i32, i32) {
        (self.row as i32, self.col as i32)
    }
}

impl HasPosition for Hazard {
    fn position(&self) -> (i32, i32) {
        self.center.position()
    }
}

impl HasPosition for Occupant {
    fn position(&self) -> (i32, i32) {
        self.cell.position()
    }
}

impl HasPosition for ResourceRecord {
    fn position(&self) -> (i32, i32) {
        self.cell.position()
    }
}

/// Entry stored in a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialEntry<T> {
    pub row: i32,
    pub col: i32,
    pub item: T,
}

impl<T> SpatialEntry<T> {
    /// Widened so that extreme `i32` coordinates cannot overflow.
    #[inline]
    fn distance_sq(&self, row: i32, col: i32) -> i128 {
        let dr = self.row as i128 - row as i128;
        let dc = self.col as i128 - col as i128;
        dr * dr + dc * dc
    }
}

/// Bucketed grid. Position (row, col) lives in bucket
/// `(floor(row / width), floor(col / width))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialHashTable<T> {
    width: i32,
    buckets: BucketMap<(i32, i32), SpatialEntry<T>>,
}

impl<T> Default for SpatialHashTable<T> {
    fn default() -> Self {
        Self::new(5) // 5 cell buckets by default
    }
}

impl<T> SpatialHashTable<T> {
    /// Create a table with the given bucket width (clamped to at least 1).
    pub fn new(width: u32) -> Self {
        Self {
            width: width.clamp(1, i32::MAX as u32) as i32,
            buckets: BucketMap::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width as u32
    }

    /// Bucket coordinates of a position. Floors toward negative infinity.
    #[inline]
    pub fn bucket_of(&self, row: i32, col: i32) -> (i32, i32) {
        (row.div_euclid(self.width), col.div_euclid(self.width))
    }

    pub fn insert(&mut self, row: i32, col: i32, item: T) {
        let bucket = self.bucket_of(row, col);
        self.buckets.push(bucket, SpatialEntry { row, col, item });
    }

    /// Insert using the position of anything that has one.
    pub fn insert_at(&mut self, at: &impl HasPosition, item: T) {
        let (row, col) = at.position();
        self.insert(row, col, item);
    }

    /// Remove the first entry at exactly (row, col) equal to `item`.
    pub fn remove(&mut self, row: i32, col: i32, item: &T) -> bool
    where
        T: PartialEq,
    {
        let bucket = self.bucket_of(row, col);
        self.buckets
            .remove_first(&bucket, |e| e.row == row && e.col == col && e.item == *item)
            .is_some()
    }

    /// Objects at exactly (row, col), in insertion order.
    pub fn query_cell(&self, row: i32, col: i32) -> Vec<&T> {
        self.buckets
            .get(&self.bucket_of(row, col))
            .iter()
            .filter(|e| e.row == row && e.col == col)
            .map(|e| &e.item)
            .collect()
    }

    /// All entries within `radius` (Euclidean, inclusive) of (row, col).
    ///
    /// Scans every bucket that the bounding box of the circle touches, then
    /// drops candidates outside the circle with a squared-distance test.
    /// Returns entries sorted by distance (closest first), then row, then column.
    pub fn query_radius(&self, row: i32, col: i32, radius: u32) -> Vec<&SpatialEntry<T>> {
        let radius_sq = radius as i128 * radius as i128;
        let radius = radius as i64;
        let width = self.width as i64;

        let min_row = (row as i64 - radius).div_euclid(width);
        let max_row = (row as i64 + radius).div_euclid(width);
        let min_col = (col as i64 - radius).div_euclid(width);
        let max_col = (col as i64 + radius).div_euclid(width);

        let mut results = Vec::new();

        // Wide queries over a sparse table: walk the buckets that exist instead.
        let span = (max_row - min_row + 1) as i128 * (max_col - min_col + 1) as i128;
        if span > self.buckets.bucket_count() as i128 {
            for (&(br, bc), entries) in self.buckets.iter() {
                let (br, bc) = (br as i64, bc as i64);
                if br < min_row || br > max_row || bc < min_col || bc > max_col {
                    continue;
                }
                results.extend(entries.iter().filter(|e| e.distance_sq(row, col) <= radius_sq));
            }
        } else {
            for br in min_row..=max_row {
                for bc in min_col..=max_col {
                    let (Ok(br), Ok(bc)) = (i32::try_from(br), i32::try_from(bc)) else {
                        continue;
                    };
                    let entries = self.buckets.get(&(br, bc));
                    results.extend(entries.iter().filter(|e| e.distance_sq(row, col) <= radius_sq));
                }
            }
        }

        // Stable: entries sharing a cell keep their insertion order.
        results.sort_by_key(|e| (e.distance_sq(row, col), e.row, e.col));
        results
    }

    /// Radius query around anything that has a position.
    pub fn query_around(&self, at: &impl HasPosition, radius: u32) -> Vec<&SpatialEntry<T>> {
        let (row, col) = at.position();
        self.query_radius(row, col, radius)
    }

    /// Get count of entries in a bucket.
    pub fn bucket_len(&self, bucket: (i32, i32)) -> usize {
        self.buckets.get(&bucket).len()
    }

    /// Get total entry count.
    pub fn len(&self) -> usize {
        self.buckets.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn brute_force(points: &[(i32, i32, u32)], row: i32, col: i32, radius: u32) -> Vec<u32> {
        let r = radius as i64;
        let mut ids: Vec<u32> = points
            .iter()
            .filter(|(pr, pc, _)| {
                let dr = (*pr - row) as i64;
                let dc = (*pc - col) as i64;
                dr * dr + dc * dc <= r * r
            })
            .map(|(_, _, id)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    fn ids(entries: Vec<&SpatialEntry<u32>>) -> Vec<u32> {
        let mut ids: Vec<u32> = entries.into_iter().map(|e| e.item).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_spatial_table_insert_query() {
        let mut table = SpatialHashTable::new(10);

        table.insert(5, 5, 1u32);
        table.insert(15, 5, 2u32);
        table.insert(100, 100, 3u32);

        // Query around 1
        let nearby = table.query_radius(5, 5, 15);
        assert_eq!(nearby.len(), 2); // 1 and 2

        // Query with smaller radius
        let nearby = table.query_radius(5, 5, 5);
        assert_eq!(nearby.len(), 1); // just 1

        // Query far away
        let nearby = table.query_radius(100, 100, 10);
        assert_eq!(nearby.len(), 1); // just 3
    }

    #[test]
    fn test_results_sorted_by_distance() {
        let mut table = SpatialHashTable::new(4);
        table.insert(0, 9, 1u32);
        table.insert(0, 3, 2u32);
        table.insert(0, 1, 3u32);

        let found: Vec<u32> = table.query_radius(0, 0, 10).iter().map(|e| e.item).collect();
        assert_eq!(found, vec![3, 2, 1]);
    }

    #[test]
    fn test_query_cell_is_exact() {
        let mut table = SpatialHashTable::new(5);
        table.insert(2, 2, 'a');
        table.insert(2, 3, 'b'); // same bucket, different cell
        table.insert(2, 2, 'c');

        assert_eq!(table.query_cell(2, 2), vec![&'a', &'c']);
        assert!(table.query_cell(4, 4).is_empty());
    }

    #[test]
    fn test_negative_positions_floor() {
        let mut table = SpatialHashTable::new(5);
        table.insert(-1, -1, 1u32);
        assert_eq!(table.bucket_of(-1, -1), (-1, -1));
        assert_eq!(table.bucket_len((-1, -1)), 1);
        assert_eq!(ids(table.query_radius(0, 0, 2)), vec![1]);
    }

    #[test]
    fn test_remove_drops_entry() {
        let mut table = SpatialHashTable::new(3);
        table.insert(4, 4, 8u32);
        assert!(table.remove(4, 4, &8));
        assert!(!table.remove(4, 4, &8));
        assert!(table.is_empty());
        assert_eq!(table.bucket_len((1, 1)), 0);
    }

    #[test]
    fn test_radius_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(42);

        for width in [1u32, 3, 5, 8] {
            let mut table = SpatialHashTable::new(width);
            let mut points = Vec::new();
            for id in 0..300u32 {
                let row = rng.gen_range(0..50);
                let col = rng.gen_range(0..50);
                table.insert(row, col, id);
                points.push((row, col, id));
            }

            for _ in 0..100 {
                let row = rng.gen_range(0..50);
                let col = rng.gen_range(0..50);
                let radius = rng.gen_range(0..20);
                assert_eq!(
                    ids(table.query_radius(row, col, radius)),
                    brute_force(&points, row, col, radius),
                    "width {width} at ({row}, {col}) radius {radius}"
                );
            }
        }
    }

    #[test]
    fn test_radius_zero_and_full_grid() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut table = SpatialHashTable::new(4);
        let mut points = Vec::new();
        for id in 0..120u32 {
            let row = rng.gen_range(0..25);
            let col = rng.gen_range(0..25);
            table.insert(row, col, id);
            points.push((row, col, id));
        }

        // Radius 0 returns exactly the objects in the query cell.
        for &(row, col, _) in &points {
            let mut expected: Vec<u32> =
                table.query_cell(row, col).into_iter().copied().collect();
            expected.sort_unstable();
            assert_eq!(ids(table.query_radius(row, col, 0)), expected);
        }

        // A radius spanning the whole grid returns everything.
        let all: Vec<u32> = (0..120).collect();
        assert_eq!(ids(table.query_radius(12, 12, 50)), all);
        assert_eq!(ids(table.query_radius(0, 0, 1_000)), all);
    }

    #[test]
    fn test_unbounded_radius_does_not_overflow() {
        let mut table = SpatialHashTable::new(1);
        table.insert(3, 3, 1u32);
        table.insert(-5, 7, 2u32);
        assert_eq!(ids(table.query_radius(0, 0, u32::MAX)), vec![1, 2]);

        // Corners of the i32 plane are within u32::MAX of the origin.
        table.insert(i32::MAX, i32::MIN, 3u32);
        table.insert(i32::MIN, i32::MAX, 4u32);
        assert_eq!(ids(table.query_radius(0, 0, u32::MAX)), vec![1, 2, 3, 4]);

        // From the far corner they sit exactly on the boundary.
        assert_eq!(ids(table.query_radius(i32::MIN, i32::MIN, u32::MAX)), vec![1, 2, 3, 4]);
        assert_eq!(ids(table.query_radius(i32::MIN, i32::MIN, u32::MAX - 1)), vec![1, 2]);
        assert_eq!(ids(table.query_radius(i32::MAX, i32::MAX, 0)), Vec::<u32>::new());
    }

    #[test]
    fn test_insert_at_positioned_items() {
        let mut table = SpatialHashTable::new(5);
        let cell = Cell::new(3, 7);
        table.insert_at(&cell, 11u32);

        assert_eq!(table.query_cell(3, 7), vec![&11]);
        assert_eq!(ids(table.query_around(&Cell::new(3, 6), 1)), vec![11]);
    }
}
