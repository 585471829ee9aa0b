//! Error Handling Module
//!
//! Defines the error types for the self-training pipeline.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Main error type for self-training operations
#[derive(Error, Debug)]
pub enum SelfTrainError {
    /// Split fraction outside (0, 1), or a split that would leave a pool empty
    #[error("Invalid split fraction {fraction}: {reason}")]
    InvalidFraction { fraction: f64, reason: String },

    /// An operation that requires examples was given an empty pool
    #[error("Empty pool: {0}")]
    EmptyPool(String),

    /// A promotion referenced an index that is not in the unlabeled pool
    #[error("Index {0} not found in the unlabeled pool (stale or duplicated promotion)")]
    IndexNotFound(usize),

    /// The classifier produced a non-finite training loss
    #[error("Non-finite training loss {loss} at epoch {epoch}")]
    NonFiniteLoss { loss: f64, epoch: usize },

    /// Error annotated with the round and pool sizes at the time of failure
    #[error("Round {round} failed (train pool: {train_size}, unlabeled pool: {unlabeled_size}): {source}")]
    Round {
        round: usize,
        train_size: usize,
        unlabeled_size: usize,
        #[source]
        source: Box<SelfTrainError>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Dataset error
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SelfTrainError {
    /// Wrap an error with the round number and pool sizes at failure time
    pub fn in_round(self, round: usize, train_size: usize, unlabeled_size: usize) -> Self {
        SelfTrainError::Round {
            round,
            train_size,
            unlabeled_size,
            source: Box::new(self),
        }
    }
}

/// Convenience Result type for self-training operations
pub type Result<T> = std::result::Result<T, SelfTrainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SelfTrainError::IndexNotFound(42);
        assert!(format!("{}", err).contains("42"));
    }

    #[test]
    fn test_round_context() {
        let err = SelfTrainError::NonFiniteLoss {
            loss: f64::NAN,
            epoch: 2,
        }
        .in_round(3, 250, 750);

        let msg = format!("{}", err);
        assert!(msg.contains("Round 3"));
        assert!(msg.contains("250"));
        assert!(msg.contains("750"));
    }

    #[test]
    fn test_invalid_fraction_display() {
        let err = SelfTrainError::InvalidFraction {
            fraction: 1.5,
            reason: "must be inside (0, 1)".to_string(),
        };
        assert!(format!("{}", err).contains("1.5"));
    }
}
