//! Pool Partitioning and Mutation
//!
//! A pool is an ordered set of example indices into a shared, read-only
//! collection, plus an overlay of pseudo-labels for promoted examples.
//! The backing collection is never mutated; moving an example between pools
//! only moves its index, so promotion is O(log n) per item rather than an
//! O(n) rebuild of sample vectors every round.
//!
//! Invariants maintained here:
//! - the train and unlabeled index sets are always pairwise disjoint
//! - promotion conserves indices: every index removed from the unlabeled
//!   pool is inserted into the train pool, nothing else changes
//! - a promotion batch is applied atomically or not at all

use std::collections::{BTreeSet, HashMap};

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::{Example, IndexedCollection};
use crate::utils::error::{Result, SelfTrainError};

/// An ordered set of indices into a shared collection, with a pseudo-label
/// overlay for indices whose ground truth has been replaced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pool {
    indices: BTreeSet<usize>,
    overlay: HashMap<usize, usize>,
}

impl Pool {
    /// Build a pool from a set of collection indices
    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            indices: indices.into_iter().collect(),
            overlay: HashMap::new(),
        }
    }

    /// Number of examples in the pool
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether the pool is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Whether the pool contains a collection index
    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    /// Iterate collection indices in ascending order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    /// Collection indices in ascending order
    pub fn ordered_indices(&self) -> Vec<usize> {
        self.indices.iter().copied().collect()
    }

    /// Number of examples carrying a pseudo-label instead of ground truth
    pub fn pseudo_labeled_count(&self) -> usize {
        self.overlay.len()
    }

    /// The pseudo-label recorded for an index, if any
    pub fn pseudo_label(&self, index: usize) -> Option<usize> {
        self.overlay.get(&index).copied()
    }

    /// Fetch an example through the pool, substituting the pseudo-label for
    /// ground truth where the overlay has one. Ground truth is never
    /// consulted again for a promoted example.
    pub fn example<C: IndexedCollection>(&self, collection: &C, index: usize) -> Option<Example> {
        if !self.indices.contains(&index) {
            return None;
        }
        let mut example = collection.get(index)?;
        if let Some(&pseudo) = self.overlay.get(&index) {
            example.label = Some(pseudo);
        }
        Some(example)
    }
}

/// Splits a collection's index range into disjoint pools by fraction,
/// shuffled with a fixed seed for reproducibility.
#[derive(Debug, Clone)]
pub struct PoolPartitioner {
    seed: u64,
}

impl PoolPartitioner {
    /// Create a partitioner with the given shuffle seed
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Partition `collection` into (train, unlabeled) pools of sizes
    /// `round(f * N)` and `N - round(f * N)`.
    ///
    /// Only index sets are allocated; underlying data is not copied.
    pub fn split<C: IndexedCollection>(
        &self,
        collection: &C,
        train_fraction: f64,
    ) -> Result<(Pool, Pool)> {
        if !(train_fraction > 0.0 && train_fraction < 1.0) {
            return Err(SelfTrainError::InvalidFraction {
                fraction: train_fraction,
                reason: "must be inside (0, 1)".to_string(),
            });
        }

        let total = collection.len();
        if total == 0 {
            return Err(SelfTrainError::InvalidFraction {
                fraction: train_fraction,
                reason: "collection is empty".to_string(),
            });
        }

        let train_size = (train_fraction * total as f64).round() as usize;
        if train_size == 0 || train_size == total {
            return Err(SelfTrainError::InvalidFraction {
                fraction: train_fraction,
                reason: format!("rounds to an empty pool for {} examples", total),
            });
        }

        let mut indices: Vec<usize> = (0..total).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        indices.shuffle(&mut rng);

        let train_pool = Pool::from_indices(indices[..train_size].iter().copied());
        let unlabeled_pool = Pool::from_indices(indices[train_size..].iter().copied());

        debug!(
            "Partitioned {} examples: {} train, {} unlabeled (fraction {:.3})",
            total,
            train_pool.len(),
            unlabeled_pool.len(),
            train_fraction
        );

        Ok((train_pool, unlabeled_pool))
    }
}

/// A single selected example: its collection index, its position within the
/// unlabeled pool at selection time, the pseudo-label to assign, and the
/// confidence that earned it the promotion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Promotion {
    /// Index into the shared backing collection
    pub index: usize,
    /// Position within the unlabeled pool's ordering at selection time
    pub local_index: usize,
    /// Predicted class assigned as the training label
    pub pseudo_label: usize,
    /// Max softmax score that ranked this example
    pub confidence: f32,
}

/// The output of confidence selection: examples to move into the train pool
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromotionBatch {
    pub entries: Vec<Promotion>,
}

impl PromotionBatch {
    /// Number of selected examples
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was selected
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Applies promotion batches, moving indices from the unlabeled pool into the
/// train pool and recording pseudo-labels in the train pool's overlay.
#[derive(Debug, Default)]
pub struct PoolMutator {
    total_promoted: usize,
}

impl PoolMutator {
    /// Create a mutator with a zeroed promotion counter
    pub fn new() -> Self {
        Self::default()
    }

    /// Total examples promoted across all calls
    pub fn total_promoted(&self) -> usize {
        self.total_promoted
    }

    /// Move every entry of `batch` from `unlabeled` into `train`, recording
    /// each pseudo-label in the train pool's overlay.
    ///
    /// Validates the whole batch before touching either pool: if any entry's
    /// index is missing from the unlabeled pool, duplicated within the batch,
    /// or already present in the train pool, the call fails with
    /// `IndexNotFound` and both pools are left exactly as they were.
    pub fn promote(
        &mut self,
        train: &mut Pool,
        unlabeled: &mut Pool,
        batch: &PromotionBatch,
    ) -> Result<()> {
        let mut seen = BTreeSet::new();
        for entry in &batch.entries {
            if !unlabeled.contains(entry.index)
                || train.contains(entry.index)
                || !seen.insert(entry.index)
            {
                return Err(SelfTrainError::IndexNotFound(entry.index));
            }
        }

        for entry in &batch.entries {
            unlabeled.indices.remove(&entry.index);
            train.indices.insert(entry.index);
            train.overlay.insert(entry.index, entry.pseudo_label);
        }

        self.total_promoted += batch.len();

        debug!(
            "Promoted {} examples (train: {}, unlabeled: {})",
            batch.len(),
            train.len(),
            unlabeled.len()
        );

        Ok(())
    }
}
