//! Run Configuration
//!
//! A typed, validated configuration struct replaces loose key lookups:
//! every field is checked up front so a bad config fails before any round
//! starts. Configs are stored as JSON on disk.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dataset::SyntheticConfig;
use crate::utils::error::{Result, SelfTrainError};

fn default_seed() -> u64 {
    42
}

/// Configuration for a full self-training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Fraction of the training universe used as the initial labeled pool,
    /// strictly inside (0, 1); the remainder becomes the unlabeled pool
    pub train_split_fraction: f64,

    /// Batch size for training steps
    pub train_batch_size: usize,

    /// Batch size for evaluation and unlabeled-pool prediction
    pub eval_batch_size: usize,

    /// Examples promoted from the unlabeled pool each round
    pub promotion_batch_size: usize,

    /// Training epochs per round before re-evaluating
    pub internal_epochs_per_round: usize,

    /// Hard bound on the number of rounds. Setting it to
    /// `unlabeled_size / promotion_batch_size` lets the loop run until the
    /// unlabeled pool is exhausted; exhaustion still terminates earlier runs.
    pub max_rounds: usize,

    /// Learning rate handed to the classifier
    pub learning_rate: f64,

    /// Random seed for the partition and epoch shuffles
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Synthetic dataset parameters used by the CLI when no external
    /// collection is wired in
    #[serde(default)]
    pub dataset: SyntheticConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            train_split_fraction: 0.2,
            train_batch_size: 64,
            eval_batch_size: 256,
            promotion_batch_size: crate::training::DEFAULT_PROMOTION_BATCH_SIZE,
            internal_epochs_per_round: crate::training::DEFAULT_EPOCHS_PER_ROUND,
            max_rounds: 10,
            learning_rate: crate::training::DEFAULT_LEARNING_RATE,
            seed: default_seed(),
            dataset: SyntheticConfig::default(),
        }
    }
}

impl RunConfig {
    /// Validate every field, failing fast on the first violation
    pub fn validate(&self) -> Result<()> {
        if !(self.train_split_fraction > 0.0 && self.train_split_fraction < 1.0) {
            return Err(SelfTrainError::InvalidFraction {
                fraction: self.train_split_fraction,
                reason: "train_split_fraction must be inside (0, 1)".to_string(),
            });
        }
        if self.train_batch_size == 0 {
            return Err(SelfTrainError::Config(
                "train_batch_size must be positive".to_string(),
            ));
        }
        if self.eval_batch_size == 0 {
            return Err(SelfTrainError::Config(
                "eval_batch_size must be positive".to_string(),
            ));
        }
        if self.promotion_batch_size == 0 {
            return Err(SelfTrainError::Config(
                "promotion_batch_size must be positive".to_string(),
            ));
        }
        if self.internal_epochs_per_round == 0 {
            return Err(SelfTrainError::Config(
                "internal_epochs_per_round must be positive".to_string(),
            ));
        }
        if self.max_rounds == 0 {
            return Err(SelfTrainError::Config(
                "max_rounds must be positive".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0) {
            return Err(SelfTrainError::Config(
                "learning_rate must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Load a configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| SelfTrainError::Serialization(e.to_string()))?;
        Ok(config)
    }

    /// Save the configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SelfTrainError::Serialization(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
