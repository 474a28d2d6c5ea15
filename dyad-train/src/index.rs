//! Compute-once, scatter-by-index
//!
//! Many edges usually share a source point. [`UniqueIndex`] splits a
//! many-to-one edge-to-source relation into the sorted set of distinct
//! sources and an inverse map, so per-source work runs once and is then
//! expanded back to edges (or edge results are reduced back to sources).

use std::ops::AddAssign;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueIndex {
    /// Distinct indices, ascending.
    unique: Vec<u32>,
    /// `unique[inverse[e]] == indices[e]`
    inverse: Vec<usize>,
}

impl UniqueIndex {
    pub fn new(indices: &[u32]) -> Self {
        let mut unique = indices.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let inverse = indices
            .iter()
            .map(|index| unique.partition_point(|&u| u < *index))
            .collect();

        Self { unique, inverse }
    }

    pub fn unique(&self) -> &[u32] {
        &self.unique
    }

    pub fn inverse(&self) -> &[usize] {
        &self.inverse
    }

    /// Number of distinct indices.
    pub fn len(&self) -> usize {
        self.unique.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unique.is_empty()
    }

    /// Pick `values[u]` for every distinct index `u`.
    pub fn gather<T: Copy>(&self, values: &[T]) -> Vec<T> {
        self.unique.iter().map(|&u| values[u as usize]).collect()
    }

    /// Expand one value per distinct index back to one value per original entry.
    pub fn expand<T: Copy>(&self, per_unique: &[T]) -> Vec<T> {
        self.inverse.iter().map(|&slot| per_unique[slot]).collect()
    }

    /// Sum per-entry values into one value per distinct index.
    pub fn reduce<T: Copy + AddAssign>(&self, per_entry: &[T], zero: T) -> Vec<T> {
        let mut out = vec![zero; self.unique.len()];
        for (&slot, &value) in self.inverse.iter().zip(per_entry) {
            out[slot] += value;
        }
        out
    }

    /// Add one value per distinct index into `out[u]`.
    pub fn scatter_add<T: Copy + AddAssign>(&self, per_unique: &[T], out: &mut [T]) {
        for (&u, &value) in self.unique.iter().zip(per_unique) {
            out[u as usize] += value;
        }
    }
}
