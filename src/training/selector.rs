//! Confidence-Based Promotion Selection
//!
//! Scores the entire unlabeled pool with the current model, normalizes each
//! score vector with softmax, and takes the top-k most confident predictions
//! as a promotion batch. Selecting only high-confidence predictions limits
//! the label noise folded back into the training pool, and the batch size
//! bounds how fast the unlabeled pool is consumed.

use rayon::prelude::*;
use tracing::debug;

use crate::classifier::{argmax, softmax, Classifier};
use crate::dataset::IndexedCollection;
use crate::pool::{Pool, Promotion, PromotionBatch};

/// Selects fixed-size promotion batches by max-softmax confidence.
#[derive(Debug, Clone)]
pub struct ConfidenceSelector {
    /// Batch size used for prediction over the unlabeled pool
    predict_batch_size: usize,
}

impl ConfidenceSelector {
    /// Create a selector that predicts in chunks of `predict_batch_size`
    pub fn new(predict_batch_size: usize) -> Self {
        Self {
            predict_batch_size: predict_batch_size.max(1),
        }
    }

    /// Rank every example in `unlabeled` by prediction confidence and return
    /// the top `min(batch_size, |unlabeled|)` as a promotion batch.
    ///
    /// Deterministic: confidence ties break toward the lower collection
    /// index, and repeated calls with unchanged model state and pool
    /// contents return the same batch. Pure with respect to both the pool
    /// and the classifier.
    pub fn select<C, D>(
        &self,
        classifier: &C,
        collection: &D,
        unlabeled: &Pool,
        batch_size: usize,
    ) -> PromotionBatch
    where
        C: Classifier + Sync,
        D: IndexedCollection + Sync,
    {
        if unlabeled.is_empty() || batch_size == 0 {
            return PromotionBatch::default();
        }

        let indices = unlabeled.ordered_indices();

        // Score each chunk independently; chunks carry their starting local
        // offset so outputs stay tied to their examples regardless of
        // scheduling order.
        let mut candidates: Vec<Promotion> = indices
            .par_chunks(self.predict_batch_size)
            .enumerate()
            .flat_map(|(chunk_idx, chunk)| {
                let local_base = chunk_idx * self.predict_batch_size;
                let mut positions = Vec::with_capacity(chunk.len());
                let mut inputs = Vec::with_capacity(chunk.len());
                for (offset, &index) in chunk.iter().enumerate() {
                    if let Some(example) = collection.get(index) {
                        positions.push((index, local_base + offset));
                        inputs.push(example.features);
                    }
                }

                let scores = classifier.predict(&inputs);

                positions
                    .into_iter()
                    .zip(scores)
                    .map(|((index, local_index), score)| {
                        let probs = softmax(&score);
                        let pseudo_label = argmax(&probs);
                        Promotion {
                            index,
                            local_index,
                            pseudo_label,
                            confidence: probs[pseudo_label],
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then(a.index.cmp(&b.index))
        });
        candidates.truncate(batch_size.min(unlabeled.len()));

        debug!(
            "Selected {} of {} unlabeled examples (min confidence {:.4})",
            candidates.len(),
            unlabeled.len(),
            candidates.last().map(|p| p.confidence).unwrap_or(0.0)
        );

        PromotionBatch {
            entries: candidates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Example, InMemoryDataset};
    use crate::utils::error::Result as CrateResult;

    /// Confidence grows with the feature value; predicted class is the
    /// feature value's integer part modulo 2.
    struct RampStub;

    impl Classifier for RampStub {
        fn num_classes(&self) -> usize {
            2
        }

        fn predict(&self, batch: &[Vec<f32>]) -> Vec<Vec<f32>> {
            batch
                .iter()
                .map(|input| {
                    let margin = input[0];
                    if (input[0] as usize) % 2 == 0 {
                        vec![margin, 0.0]
                    } else {
                        vec![0.0, margin]
                    }
                })
                .collect()
        }

        fn fit_step(&mut self, _batch: &[Vec<f32>], _labels: &[usize]) -> CrateResult<f32> {
            Ok(0.0)
        }
    }

    /// Same score vector for every input
    struct ConstantStub;

    impl Classifier for ConstantStub {
        fn num_classes(&self) -> usize {
            2
        }

        fn predict(&self, batch: &[Vec<f32>]) -> Vec<Vec<f32>> {
            batch.iter().map(|_| vec![1.0, 0.0]).collect()
        }

        fn fit_step(&mut self, _batch: &[Vec<f32>], _labels: &[usize]) -> CrateResult<f32> {
            Ok(0.0)
        }
    }

    fn ramp_dataset(n: usize) -> InMemoryDataset {
        let examples = (0..n)
            .map(|i| Example::labeled(vec![i as f32], i % 2))
            .collect();
        InMemoryDataset::new(examples, 2).unwrap()
    }

    #[test]
    fn test_selection_is_deterministic() {
        let data = ramp_dataset(40);
        let pool = Pool::from_indices(0..40);
        let selector = ConfidenceSelector::new(8);

        let a = selector.select(&RampStub, &data, &pool, 10);
        let b = selector.select(&RampStub, &data, &pool, 10);

        let indices_a: Vec<usize> = a.entries.iter().map(|p| p.index).collect();
        let indices_b: Vec<usize> = b.entries.iter().map(|p| p.index).collect();
        assert_eq!(indices_a, indices_b);
    }

    #[test]
    fn test_ranking_is_monotonic() {
        let data = ramp_dataset(40);
        let pool = Pool::from_indices(0..40);
        let batch = ConfidenceSelector::new(8).select(&RampStub, &data, &pool, 15);

        assert_eq!(batch.len(), 15);
        for pair in batch.entries.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
        // Highest feature value has the highest margin, so it ranks first
        assert_eq!(batch.entries[0].index, 39);
    }

    #[test]
    fn test_ties_break_toward_lower_index() {
        let data = ramp_dataset(20);
        let pool = Pool::from_indices(0..20);
        let batch = ConfidenceSelector::new(4).select(&ConstantStub, &data, &pool, 5);

        let indices: Vec<usize> = batch.entries.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_batch_clamped_to_pool_size() {
        let data = ramp_dataset(30);
        let pool = Pool::from_indices(0..30);
        let batch = ConfidenceSelector::new(8).select(&RampStub, &data, &pool, 50);

        assert_eq!(batch.len(), 30);
    }

    #[test]
    fn test_empty_pool_yields_empty_batch() {
        let data = ramp_dataset(5);
        let batch = ConfidenceSelector::new(4).select(&RampStub, &data, &Pool::default(), 10);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_pseudo_label_matches_argmax() {
        let data = ramp_dataset(10);
        let pool = Pool::from_indices(0..10);
        let batch = ConfidenceSelector::new(4).select(&RampStub, &data, &pool, 10);

        for entry in &batch.entries {
            assert_eq!(entry.pseudo_label, entry.index % 2);
        }
    }

    #[test]
    fn test_local_indices_valid_and_unique() {
        let data = ramp_dataset(25);
        let pool = Pool::from_indices(0..25);
        let batch = ConfidenceSelector::new(7).select(&RampStub, &data, &pool, 25);

        let ordering = pool.ordered_indices();
        let mut seen = std::collections::BTreeSet::new();
        for entry in &batch.entries {
            assert!(entry.local_index < pool.len());
            assert_eq!(ordering[entry.local_index], entry.index);
            assert!(seen.insert(entry.local_index));
        }
    }
}
