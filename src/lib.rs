//! # Self-Training for Semi-Supervised Classification
//!
//! A Rust library implementing the self-training (pseudo-labeling) loop for
//! semi-supervised image classification: a classifier is trained on a small
//! labeled pool, evaluated on a held-out test pool, and used to promote its
//! most confident predictions from an unlabeled pool back into the training
//! pool, round after round.
//!
//! The model itself stays behind the [`classifier::Classifier`] contract;
//! the crate's focus is the correctness of the pool bookkeeping: disjoint
//! index sets over a shared read-only collection, atomic promotion with a
//! pseudo-label overlay, and deterministic confidence-ranked selection.
//!
//! ## Modules
//!
//! - `dataset`: the indexed-collection contract plus in-memory and synthetic datasets
//! - `classifier`: the model capability contract and a built-in linear model
//! - `pool`: pool partitioning, the pseudo-label overlay, and atomic promotion
//! - `training`: evaluation, confidence selection, and the round loop
//! - `config`: typed, validated run configuration
//! - `utils`: error types and logging setup
//!
//! ## Quick Start
//!
//! ```rust
//! use selftrain::classifier::LinearClassifier;
//! use selftrain::config::RunConfig;
//! use selftrain::training::SelfTrainingLoop;
//!
//! let config = RunConfig::default();
//! let (train, test) = config.dataset.generate()?;
//!
//! let model = LinearClassifier::new(
//!     train.feature_dim(),
//!     train.num_classes(),
//!     config.learning_rate,
//!     config.seed,
//! );
//!
//! let outcome = SelfTrainingLoop::new(config, train, test, model)?.run()?;
//! assert!(!outcome.history.is_empty());
//! # Ok::<(), selftrain::utils::error::SelfTrainError>(())
//! ```

pub mod classifier;
pub mod config;
pub mod dataset;
pub mod pool;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use classifier::{Classifier, LinearClassifier};
pub use config::RunConfig;
pub use dataset::{Example, InMemoryDataset, IndexedCollection, SyntheticConfig};
pub use pool::{Pool, PoolMutator, PoolPartitioner, Promotion, PromotionBatch};
pub use training::{ConfidenceSelector, LoopOutcome, LoopPhase, RoundRecord, SelfTrainingLoop};
pub use utils::error::{Result, SelfTrainError};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
