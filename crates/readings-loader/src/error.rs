//! Error types for the bulk loader.

use thiserror::Error;

/// Errors that can occur while importing a staged file.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// PostgreSQL connection or query error.
    #[error("PostgreSQL error: {0}")]
    PostgreSQL(#[from] tokio_postgres::Error),

    /// The import procedure returned no status text.
    #[error("Import of '{0}' returned no status")]
    MissingStatus(String),
}
