//! Classifier Contract and Built-in Linear Model
//!
//! The training loop only depends on the [`Classifier`] trait: a stateful
//! model that scores batches and updates its weights from labeled batches.
//! Architecture and optimization internals stay behind this seam, so the loop
//! can be driven by anything from a stub to a full CNN backend.
//!
//! A minimal softmax-regression classifier is included so the binary can run
//! end to end; it is intentionally small and is not the point of the crate.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::utils::error::Result;

/// Capability contract for the model driven by the self-training loop.
///
/// Weights must persist across calls; `predict` must not change model state.
pub trait Classifier {
    /// Number of classes in the score vectors
    fn num_classes(&self) -> usize;

    /// Score a batch of inputs; one unnormalized score vector per input
    fn predict(&self, batch: &[Vec<f32>]) -> Vec<Vec<f32>>;

    /// One optimization step on a labeled batch; returns the batch loss
    fn fit_step(&mut self, batch: &[Vec<f32>], labels: &[usize]) -> Result<f32>;
}

/// Numerically stable softmax over a score vector
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|&e| e / sum).collect()
}

/// Index of the maximum score; ties resolve to the lowest index
pub fn argmax(scores: &[f32]) -> usize {
    let mut best = 0;
    for (i, &s) in scores.iter().enumerate().skip(1) {
        if s > scores[best] {
            best = i;
        }
    }
    best
}

/// Multinomial logistic regression trained with SGD on cross-entropy.
///
/// Deterministic for a fixed seed: weight init uses a seeded ChaCha8 RNG and
/// updates depend only on the batches presented.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearClassifier {
    /// Weight matrix, one row per class
    weights: Vec<Vec<f32>>,
    /// Per-class bias
    biases: Vec<f32>,
    feature_dim: usize,
    num_classes: usize,
    learning_rate: f32,
}

impl LinearClassifier {
    /// Create a classifier with small random weights
    pub fn new(feature_dim: usize, num_classes: usize, learning_rate: f64, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let weights = (0..num_classes)
            .map(|_| {
                (0..feature_dim)
                    .map(|_| rng.gen_range(-0.05f32..0.05))
                    .collect()
            })
            .collect();

        Self {
            weights,
            biases: vec![0.0; num_classes],
            feature_dim,
            num_classes,
            learning_rate: learning_rate as f32,
        }
    }

    fn logits(&self, input: &[f32]) -> Vec<f32> {
        self.weights
            .iter()
            .zip(self.biases.iter())
            .map(|(row, &bias)| {
                row.iter().zip(input.iter()).map(|(&w, &x)| w * x).sum::<f32>() + bias
            })
            .collect()
    }
}

impl Classifier for LinearClassifier {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn predict(&self, batch: &[Vec<f32>]) -> Vec<Vec<f32>> {
        batch.iter().map(|input| self.logits(input)).collect()
    }

    fn fit_step(&mut self, batch: &[Vec<f32>], labels: &[usize]) -> Result<f32> {
        debug_assert_eq!(batch.len(), labels.len());
        if batch.is_empty() {
            return Ok(0.0);
        }

        let batch_len = batch.len() as f32;
        let mut total_loss = 0.0f32;
        let mut weight_grads = vec![vec![0.0f32; self.feature_dim]; self.num_classes];
        let mut bias_grads = vec![0.0f32; self.num_classes];

        for (input, &label) in batch.iter().zip(labels.iter()) {
            let probs = softmax(&self.logits(input));
            total_loss += -(probs[label].max(1e-12)).ln();

            // dL/dz = p - onehot(label)
            for class in 0..self.num_classes {
                let delta = probs[class] - if class == label { 1.0 } else { 0.0 };
                for (grad, &x) in weight_grads[class].iter_mut().zip(input.iter()) {
                    *grad += delta * x;
                }
                bias_grads[class] += delta;
            }
        }

        let scale = self.learning_rate / batch_len;
        for class in 0..self.num_classes {
            for (weight, grad) in self.weights[class].iter_mut().zip(&weight_grads[class]) {
                *weight -= scale * grad;
            }
            self.biases[class] -= scale * bias_grads[class];
        }

        Ok(total_loss / batch_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_softmax_large_scores_stable() {
        let probs = softmax(&[1000.0, 1001.0]);
        assert!(probs.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_argmax_tie_breaks_low() {
        assert_eq!(argmax(&[0.5, 0.5, 0.1]), 0);
        assert_eq!(argmax(&[0.1, 0.9, 0.2]), 1);
    }

    #[test]
    fn test_fit_step_reduces_loss_on_separable_data() {
        let batch = vec![vec![-1.0f32], vec![1.0]];
        let labels = vec![0usize, 1];

        let mut model = LinearClassifier::new(1, 2, 0.5, 42);
        let first_loss = model.fit_step(&batch, &labels).unwrap();

        let mut last_loss = first_loss;
        for _ in 0..200 {
            last_loss = model.fit_step(&batch, &labels).unwrap();
        }
        assert!(last_loss < first_loss);

        let scores = model.predict(&batch);
        assert_eq!(argmax(&scores[0]), 0);
        assert_eq!(argmax(&scores[1]), 1);
    }

    #[test]
    fn test_seeded_init_deterministic() {
        let a = LinearClassifier::new(4, 3, 0.1, 9);
        let b = LinearClassifier::new(4, 3, 0.1, 9);
        assert_eq!(a.predict(&[vec![1.0; 4]]), b.predict(&[vec![1.0; 4]]));
    }

    #[test]
    fn test_predict_is_stateless() {
        let model = LinearClassifier::new(2, 2, 0.1, 1);
        let input = vec![vec![0.3, -0.7]];
        assert_eq!(model.predict(&input), model.predict(&input));
    }
}
