//! Training module for the self-training pipeline
//!
//! This module provides:
//! - Batched accuracy evaluation over pools
//! - Confidence-based selection of pseudo-label promotion batches
//! - The round-based self-training loop and its telemetry
//!
//! ## Self-Training Approach
//!
//! 1. Train the classifier on the labeled pool
//! 2. Evaluate on the held-out test pool
//! 3. Predict over the unlabeled pool and rank by confidence
//! 4. Promote the top predictions into the training pool as pseudo-labels
//! 5. Repeat until the unlabeled pool is exhausted or the budget is spent

pub mod evaluator;
pub mod selector;
pub mod self_training;

pub use evaluator::evaluate;
pub use selector::ConfidenceSelector;
pub use self_training::{LoopOutcome, LoopPhase, RoundRecord, SelfTrainingLoop};

/// Default number of internal epochs per round
pub const DEFAULT_EPOCHS_PER_ROUND: usize = 3;

/// Default promotion batch size
pub const DEFAULT_PROMOTION_BATCH_SIZE: usize = 50;

/// Default learning rate
pub const DEFAULT_LEARNING_RATE: f64 = 0.01;
