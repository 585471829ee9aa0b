//! Batched Accuracy Evaluation
//!
//! Scores a classifier over a pool in fixed-size batches and reports the
//! mean of the per-batch accuracies (batches weighted equally, matching the
//! averaging used while the model was developed, not weighted by batch size).

use rayon::prelude::*;

use crate::classifier::{argmax, Classifier};
use crate::dataset::IndexedCollection;
use crate::pool::Pool;
use crate::utils::error::{Result, SelfTrainError};

/// Evaluate `classifier` over `pool`, returning accuracy in [0, 1].
///
/// The pool is walked in ascending index order and chunked into batches of
/// `batch_size` (the last batch may be smaller). Batches are scored in
/// parallel but collected in order, so the result is identical to a
/// sequential pass up to floating-point summation order.
pub fn evaluate<C, D>(classifier: &C, collection: &D, pool: &Pool, batch_size: usize) -> Result<f64>
where
    C: Classifier + Sync,
    D: IndexedCollection + Sync,
{
    if pool.is_empty() {
        return Err(SelfTrainError::EmptyPool(
            "cannot evaluate over zero examples".to_string(),
        ));
    }
    if batch_size == 0 {
        return Err(SelfTrainError::Config(
            "eval batch size must be positive".to_string(),
        ));
    }

    let indices = pool.ordered_indices();

    let batch_accuracies: Vec<f64> = indices
        .par_chunks(batch_size)
        .map(|chunk| {
            let mut inputs = Vec::with_capacity(chunk.len());
            let mut labels = Vec::with_capacity(chunk.len());
            for &index in chunk {
                if let Some(example) = pool.example(collection, index) {
                    inputs.push(example.features);
                    labels.push(example.label);
                }
            }

            if inputs.is_empty() {
                return 0.0;
            }

            let scores = classifier.predict(&inputs);
            let correct = scores
                .iter()
                .zip(labels.iter())
                .filter(|(score, label)| **label == Some(argmax(score.as_slice())))
                .count();

            correct as f64 / inputs.len() as f64
        })
        .collect();

    Ok(batch_accuracies.iter().sum::<f64>() / batch_accuracies.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Example, InMemoryDataset};
    use crate::pool::Pool;
    use crate::utils::error::Result as CrateResult;

    /// Predicts class 1 when the first feature is positive, else class 0
    struct SignStub;

    impl Classifier for SignStub {
        fn num_classes(&self) -> usize {
            2
        }

        fn predict(&self, batch: &[Vec<f32>]) -> Vec<Vec<f32>> {
            batch
                .iter()
                .map(|input| {
                    if input[0] > 0.0 {
                        vec![0.0, 1.0]
                    } else {
                        vec![1.0, 0.0]
                    }
                })
                .collect()
        }

        fn fit_step(&mut self, _batch: &[Vec<f32>], _labels: &[usize]) -> CrateResult<f32> {
            Ok(0.0)
        }
    }

    fn dataset(features: &[f32], labels: &[usize]) -> InMemoryDataset {
        let examples = features
            .iter()
            .zip(labels.iter())
            .map(|(&f, &l)| Example::labeled(vec![f], l))
            .collect();
        InMemoryDataset::new(examples, 2).unwrap()
    }

    #[test]
    fn test_perfect_accuracy() {
        let data = dataset(&[-1.0, -2.0, 1.0, 2.0], &[0, 0, 1, 1]);
        let pool = Pool::from_indices(0..4);

        let accuracy = evaluate(&SignStub, &data, &pool, 2).unwrap();
        assert!((accuracy - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_batches_weighted_equally() {
        // Three examples, batch size 2: first batch [correct, correct],
        // second batch [wrong]. Equal-weighted mean is (1.0 + 0.0) / 2,
        // not 2/3 as per-example weighting would give.
        let data = dataset(&[-1.0, -1.0, -1.0], &[0, 0, 1]);
        let pool = Pool::from_indices(0..3);

        let accuracy = evaluate(&SignStub, &data, &pool, 2).unwrap();
        assert!((accuracy - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_pool_fails() {
        let data = dataset(&[1.0], &[1]);
        let pool = Pool::default();

        assert!(matches!(
            evaluate(&SignStub, &data, &pool, 4),
            Err(SelfTrainError::EmptyPool(_))
        ));
    }

    #[test]
    fn test_overlay_label_used_for_scoring() {
        // Ground truth says 0, overlay pseudo-label says 1; the stub predicts
        // 1 for positive features, so accuracy follows the overlay.
        let data = dataset(&[1.0], &[0]);
        let (mut train, mut unlabeled) =
            (Pool::default(), Pool::from_indices(std::iter::once(0)));

        let batch = crate::pool::PromotionBatch {
            entries: vec![crate::pool::Promotion {
                index: 0,
                local_index: 0,
                pseudo_label: 1,
                confidence: 0.9,
            }],
        };
        crate::pool::PoolMutator::new()
            .promote(&mut train, &mut unlabeled, &batch)
            .unwrap();

        let accuracy = evaluate(&SignStub, &data, &train, 1).unwrap();
        assert!((accuracy - 1.0).abs() < 1e-9);
    }
}
