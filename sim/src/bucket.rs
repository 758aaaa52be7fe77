//! Chained bucket store shared by the cell- and id-keyed indices.

use std::collections::HashMap;
use std::hash::Hash;

/// Map from a key to a chain of entries.
///
/// Entries with the same key are appended to the key's bucket, never
/// overwritten. A bucket is dropped as soon as its last entry is removed, so
/// `contains_key` is false for every key that holds nothing.
#[derive(Debug, Clone)]
pub struct BucketMap<K, V> {
    buckets: HashMap<K, Vec<V>>,
    entries: usize,
}

impl<K: Eq + Hash, V> Default for BucketMap<K, V> {
    fn default() -> Self {
        Self {
            buckets: HashMap::new(),
            entries: 0,
        }
    }
}

impl<K: Eq + Hash, V: PartialEq> PartialEq for BucketMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries && self.buckets == other.buckets
    }
}

impl<K: Eq + Hash, V: Eq> Eq for BucketMap<K, V> {}

impl<K: Eq + Hash, V> BucketMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry to the key's bucket, creating the bucket if needed.
    pub fn push(&mut self, key: K, value: V) {
        self.buckets.entry(key).or_default().push(value);
        self.entries += 1;
    }

    /// Remove the first entry of the key's bucket matching `pred`.
    pub fn remove_first(&mut self, key: &K, mut pred: impl FnMut(&V) -> bool) -> Option<V> {
        let bucket = self.buckets.get_mut(key)?;
        let pos = bucket.iter().position(|v| pred(v))?;
        let removed = bucket.remove(pos);
        if bucket.is_empty() {
            self.buckets.remove(key);
        }
        self.entries -= 1;
        Some(removed)
    }

    /// Entries of a bucket, empty if the key holds nothing.
    pub fn get(&self, key: &K) -> &[V] {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.buckets.contains_key(key)
    }

    /// Number of non-empty buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of entries across all buckets.
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.entries = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &[V])> {
        self.buckets.iter().map(|(k, v)| (k, v.as_slice()))
    }
}
