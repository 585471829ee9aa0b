//! Dataset Module
//!
//! Defines the abstract indexed-collection contract the training loop
//! consumes, an in-memory implementation, and a seeded synthetic dataset
//! generator so the full pipeline can run without external data.
//!
//! Image decoding, on-disk formats, and transforms are deliberately outside
//! this crate; anything that exposes size and random access to
//! `(input, label)` pairs can drive the loop.

use std::collections::HashMap;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::utils::error::{Result, SelfTrainError};

/// A single example: a flat feature vector plus an optional class label.
///
/// The label is `None` for examples the model must treat as unlabeled; a
/// pseudo-label is substituted through the pool overlay, never by mutating
/// the example itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Example {
    /// Input features (flattened image or embedding)
    pub features: Vec<f32>,
    /// Ground-truth class label, if known
    pub label: Option<usize>,
}

impl Example {
    /// Create a labeled example
    pub fn labeled(features: Vec<f32>, label: usize) -> Self {
        Self {
            features,
            label: Some(label),
        }
    }

    /// Create an unlabeled example
    pub fn unlabeled(features: Vec<f32>) -> Self {
        Self {
            features,
            label: None,
        }
    }
}

/// A finite, ordered collection of examples with random access by position.
///
/// Implementations are read-only and shared across pools; pools only hold
/// index sets into the collection.
pub trait IndexedCollection {
    /// Number of examples in the collection
    fn len(&self) -> usize;

    /// Whether the collection is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Random access by position; `None` if out of bounds
    fn get(&self, index: usize) -> Option<Example>;
}

/// An in-memory collection of examples with a fixed feature dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryDataset {
    examples: Vec<Example>,
    feature_dim: usize,
    num_classes: usize,
}

impl InMemoryDataset {
    /// Build a dataset from examples, validating dimensional consistency
    pub fn new(examples: Vec<Example>, num_classes: usize) -> Result<Self> {
        let feature_dim = examples
            .first()
            .map(|e| e.features.len())
            .ok_or_else(|| SelfTrainError::Dataset("no examples provided".to_string()))?;

        for (i, example) in examples.iter().enumerate() {
            if example.features.len() != feature_dim {
                return Err(SelfTrainError::Dataset(format!(
                    "example {} has {} features, expected {}",
                    i,
                    example.features.len(),
                    feature_dim
                )));
            }
            if let Some(label) = example.label {
                if label >= num_classes {
                    return Err(SelfTrainError::Dataset(format!(
                        "example {} has label {} outside [0, {})",
                        i, label, num_classes
                    )));
                }
            }
        }

        Ok(Self {
            examples,
            feature_dim,
            num_classes,
        })
    }

    /// Feature dimensionality shared by all examples
    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    /// Number of classes the labels are drawn from
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Per-class example counts (unlabeled examples excluded)
    pub fn class_counts(&self) -> HashMap<usize, usize> {
        let mut counts = HashMap::new();
        for example in &self.examples {
            if let Some(label) = example.label {
                *counts.entry(label).or_insert(0) += 1;
            }
        }
        counts
    }
}

impl IndexedCollection for InMemoryDataset {
    fn len(&self) -> usize {
        self.examples.len()
    }

    fn get(&self, index: usize) -> Option<Example> {
        self.examples.get(index).cloned()
    }
}

/// Configuration for the synthetic Gaussian-cluster dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticConfig {
    /// Number of examples in the training universe (later split into pools)
    pub train_examples: usize,
    /// Number of examples in the held-out test collection
    pub test_examples: usize,
    /// Number of classes
    pub num_classes: usize,
    /// Feature dimensionality
    pub feature_dim: usize,
    /// Half-width of the uniform noise added around each class center
    pub noise: f32,
    /// Random seed for cluster centers and sampling
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            train_examples: 2000,
            test_examples: 500,
            num_classes: 10,
            feature_dim: 16,
            noise: 0.35,
            seed: 7,
        }
    }
}

impl SyntheticConfig {
    /// Generate a (train, test) pair of collections sharing the same class
    /// centers, so the test set is drawn from the same distribution.
    pub fn generate(&self) -> Result<(InMemoryDataset, InMemoryDataset)> {
        if self.num_classes < 2 {
            return Err(SelfTrainError::Dataset(
                "synthetic dataset needs at least 2 classes".to_string(),
            ));
        }
        if self.train_examples == 0 || self.test_examples == 0 {
            return Err(SelfTrainError::Dataset(
                "synthetic dataset sizes must be positive".to_string(),
            ));
        }
        if !(self.noise > 0.0) {
            return Err(SelfTrainError::Dataset(
                "synthetic noise half-width must be positive".to_string(),
            ));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        // One center per class, uniform in [-1, 1]^d
        let centers: Vec<Vec<f32>> = (0..self.num_classes)
            .map(|_| {
                (0..self.feature_dim)
                    .map(|_| rng.gen_range(-1.0f32..1.0))
                    .collect()
            })
            .collect();

        let sample = |count: usize, rng: &mut ChaCha8Rng| -> Vec<Example> {
            (0..count)
                .map(|i| {
                    let label = i % self.num_classes;
                    let features = centers[label]
                        .iter()
                        .map(|&c| c + rng.gen_range(-self.noise..self.noise))
                        .collect();
                    Example::labeled(features, label)
                })
                .collect()
        };

        let train = InMemoryDataset::new(sample(self.train_examples, &mut rng), self.num_classes)?;
        let test = InMemoryDataset::new(sample(self.test_examples, &mut rng), self.num_classes)?;

        Ok((train, test))
    }
}
