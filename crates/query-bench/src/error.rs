//! Error types for the query harness.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while running range queries.
#[derive(Error, Debug)]
pub enum QueryBenchError {
    /// PostgreSQL connection or query error.
    #[error("PostgreSQL error: {0}")]
    PostgreSQL(#[from] tokio_postgres::Error),

    /// A pool was requested with zero connections.
    #[error("Connection pool size must be at least 1")]
    EmptyPool,

    /// The pool semaphore was closed while waiting for a connection.
    #[error("Connection pool is closed")]
    PoolClosed,

    /// The `nmi` column has a type the harness cannot bind.
    #[error("Unsupported type for nmi column: {0}")]
    UnsupportedNmiType(String),

    /// The meter id does not fit the `nmi` column type.
    #[error("Meter id {nmi} does not fit column type {column_type}")]
    NmiOutOfRange { nmi: u64, column_type: String },

    /// A query did not finish within the task timeout.
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    /// A query task panicked or was cancelled.
    #[error("Query task failed: {0}")]
    Task(String),
}

/// Errors from latency aggregation.
#[derive(Error, Debug, PartialEq)]
pub enum StatsError {
    /// Standard deviation needs at least two samples.
    #[error("At least 2 latency samples are required, got {0}")]
    InsufficientSamples(usize),

    /// A sample was NaN or infinite.
    #[error("Latency samples must be finite")]
    NonFiniteSample,
}
