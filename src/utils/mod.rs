//! Utility modules: error types and logging setup

pub mod error;
pub mod logging;

pub use error::{Result, SelfTrainError};
pub use logging::{init_logging, LogConfig, LogLevel};
