//! Self-Training Loop
//!
//! Orchestrates pseudo-labeling rounds over a pair of pools: train the
//! classifier on the train pool, evaluate on the held-out test pool, select
//! the most confident predictions over the unlabeled pool, and promote them
//! into the train pool with their pseudo-labels. Rounds repeat until the
//! unlabeled pool is exhausted or the round budget is reached.
//!
//! Each round's training depends on the previous round's promotions, so
//! rounds run strictly sequentially; parallelism lives inside batch
//! prediction (see `evaluator` and `selector`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classifier::Classifier;
use crate::config::RunConfig;
use crate::dataset::IndexedCollection;
use crate::pool::{Pool, PoolMutator, PoolPartitioner};
use crate::training::evaluator::evaluate;
use crate::training::selector::ConfidenceSelector;
use crate::utils::error::{Result, SelfTrainError};

/// Phase of the round state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopPhase {
    Init,
    Training,
    Evaluating,
    Selecting,
    Promoting,
    Done,
}

/// Per-round telemetry, appended to an immutable history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Round number (0-indexed)
    pub round: usize,
    /// Summed batch loss for each internal training epoch
    pub epoch_losses: Vec<f64>,
    /// Accuracy on the held-out test pool after this round's training
    pub test_accuracy: f64,
    /// Number of examples promoted this round
    pub promoted: usize,
    /// Unlabeled pool size after promotion
    pub unlabeled_remaining: usize,
}

impl std::fmt::Display for RoundRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "round {:>3} | loss {:>9.4} | test acc {:>6.2}% | promoted {:>4} | unlabeled left {:>6}",
            self.round + 1,
            self.epoch_losses.last().copied().unwrap_or(0.0),
            self.test_accuracy * 100.0,
            self.promoted,
            self.unlabeled_remaining
        )
    }
}

/// Everything the loop yields on completion
#[derive(Debug)]
pub struct LoopOutcome<C> {
    /// The trained classifier
    pub classifier: C,
    /// Final train pool (the loop's primary artifact)
    pub train_pool: Pool,
    /// Whatever remained unpromoted
    pub unlabeled_pool: Pool,
    /// One record per completed round
    pub history: Vec<RoundRecord>,
}

/// Round orchestrator with injected classifier and configuration.
///
/// Pools are owned exclusively by the loop while it runs; the backing
/// collections are read-only and shared.
#[derive(Debug)]
pub struct SelfTrainingLoop<C, D> {
    config: RunConfig,
    collection: D,
    test_collection: D,
    classifier: C,
    train_pool: Pool,
    unlabeled_pool: Pool,
    test_pool: Pool,
    selector: ConfidenceSelector,
    mutator: PoolMutator,
    history: Vec<RoundRecord>,
    round: usize,
    phase: LoopPhase,
    rng: ChaCha8Rng,
    cancel: Option<Arc<AtomicBool>>,
}

impl<C, D> SelfTrainingLoop<C, D>
where
    C: Classifier + Sync,
    D: IndexedCollection + Sync,
{
    /// Set up a loop: validates the configuration and performs the initial
    /// partition. Precondition failures (bad fraction, empty collections)
    /// surface here, before any round starts.
    pub fn new(config: RunConfig, collection: D, test_collection: D, classifier: C) -> Result<Self> {
        config.validate()?;

        if test_collection.is_empty() {
            return Err(SelfTrainError::EmptyPool(
                "test collection has no examples".to_string(),
            ));
        }

        let partitioner = PoolPartitioner::new(config.seed);
        let (train_pool, unlabeled_pool) =
            partitioner.split(&collection, config.train_split_fraction)?;
        let test_pool = Pool::from_indices(0..test_collection.len());

        info!(
            "Initialized pools: {} train, {} unlabeled, {} test",
            train_pool.len(),
            unlabeled_pool.len(),
            test_pool.len()
        );

        // Decorrelate the epoch-shuffle stream from the partition shuffle
        let rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(1));
        let selector = ConfidenceSelector::new(config.eval_batch_size);

        Ok(Self {
            selector,
            mutator: PoolMutator::new(),
            train_pool,
            unlabeled_pool,
            test_pool,
            collection,
            test_collection,
            classifier,
            history: Vec::new(),
            round: 0,
            phase: LoopPhase::Init,
            rng,
            config,
            cancel: None,
        })
    }

    /// Install a cooperative cancellation flag, checked between rounds only
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Current phase of the state machine
    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    /// Rounds completed so far
    pub fn round(&self) -> usize {
        self.round
    }

    /// Run rounds to completion and yield the final pools, classifier state,
    /// and round history.
    pub fn run(mut self) -> Result<LoopOutcome<C>> {
        info!(
            "Starting self-training: {} rounds max, promotion batch {}",
            self.config.max_rounds, self.config.promotion_batch_size
        );

        while self.phase != LoopPhase::Done {
            if let Some(flag) = &self.cancel {
                if flag.load(Ordering::Relaxed) {
                    warn!("Cancellation requested; stopping before round {}", self.round + 1);
                    break;
                }
            }

            self.phase = LoopPhase::Training;
            let epoch_losses = self
                .train_round()
                .map_err(|e| self.round_context(e))?;

            self.phase = LoopPhase::Evaluating;
            let test_accuracy = evaluate(
                &self.classifier,
                &self.test_collection,
                &self.test_pool,
                self.config.eval_batch_size,
            )
            .map_err(|e| self.round_context(e))?;

            self.phase = LoopPhase::Selecting;
            let batch = self.selector.select(
                &self.classifier,
                &self.collection,
                &self.unlabeled_pool,
                self.config.promotion_batch_size,
            );

            self.phase = LoopPhase::Promoting;
            let promoted = batch.len();
            self.mutator
                .promote(&mut self.train_pool, &mut self.unlabeled_pool, &batch)
                .map_err(|e| self.round_context(e))?;

            let record = RoundRecord {
                round: self.round,
                epoch_losses,
                test_accuracy,
                promoted,
                unlabeled_remaining: self.unlabeled_pool.len(),
            };
            info!("{}", record);
            self.history.push(record);
            self.round += 1;

            if self.unlabeled_pool.is_empty() || self.round >= self.config.max_rounds {
                self.phase = LoopPhase::Done;
            }
        }

        info!(
            "Self-training finished: {} rounds, {} examples promoted, final train pool {}",
            self.round,
            self.mutator.total_promoted(),
            self.train_pool.len()
        );

        Ok(LoopOutcome {
            classifier: self.classifier,
            train_pool: self.train_pool,
            unlabeled_pool: self.unlabeled_pool,
            history: self.history,
        })
    }

    /// Run the configured number of internal epochs over the train pool,
    /// returning the per-epoch summed batch losses.
    fn train_round(&mut self) -> Result<Vec<f64>> {
        let mut epoch_losses = Vec::with_capacity(self.config.internal_epochs_per_round);

        for epoch in 0..self.config.internal_epochs_per_round {
            let mut order = self.train_pool.ordered_indices();
            order.shuffle(&mut self.rng);

            let mut epoch_loss = 0.0f64;
            for chunk in order.chunks(self.config.train_batch_size) {
                let mut inputs = Vec::with_capacity(chunk.len());
                let mut labels = Vec::with_capacity(chunk.len());
                for &index in chunk {
                    if let Some(example) = self.train_pool.example(&self.collection, index) {
                        if let Some(label) = example.label {
                            inputs.push(example.features);
                            labels.push(label);
                        }
                    }
                }

                if inputs.is_empty() {
                    continue;
                }

                let loss = f64::from(self.classifier.fit_step(&inputs, &labels)?);
                if !loss.is_finite() {
                    return Err(SelfTrainError::NonFiniteLoss { loss, epoch });
                }
                epoch_loss += loss;
            }

            debug!(
                "  round {} epoch {}/{}: loss {:.4}",
                self.round + 1,
                epoch + 1,
                self.config.internal_epochs_per_round,
                epoch_loss
            );
            epoch_losses.push(epoch_loss);
        }

        Ok(epoch_losses)
    }

    fn round_context(&self, error: SelfTrainError) -> SelfTrainError {
        error.in_round(self.round, self.train_pool.len(), self.unlabeled_pool.len())
    }
}
