//! Error types for the readings generator.

use thiserror::Error;

/// Errors that can occur while generating or compressing reading files.
#[derive(Error, Debug)]
pub enum GeneratorError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
