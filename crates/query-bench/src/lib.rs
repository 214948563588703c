//! Concurrent range-query latency harness.
//!
//! A fixed-size [`ConnectionPool`] is shared by a bounded set of workers.
//! Each worker runs one randomized [`QueryPlan`] and returns its latency;
//! samples are merged after all workers have joined and summarized as
//! [`LatencyStats`].
//!
//! # Example
//!
//! ```ignore
//! use query_bench::{run_queries, ConnectionPool, HarnessConfig, PgQueryExecutor};
//!
//! let pool = ConnectionPool::connect(&connection_string, 8).await?;
//! let executor = Arc::new(PgQueryExecutor::new(pool, "readings"));
//! let outcome = run_queries(executor, &config).await;
//! let stats = LatencyStats::from_samples(&outcome.samples)?;
//! ```

mod error;
mod harness;
mod pool;
mod query;
mod stats;

pub use error::{QueryBenchError, StatsError};
pub use harness::{run_queries, HarnessConfig, HarnessOutcome};
pub use pool::{ConnectionPool, PooledClient};
pub use query::{
    range_query_sql, PgQueryExecutor, QueryBounds, QueryExecutor, QueryPlan, QuerySample,
    DEFAULT_MAX_NMI,
};
pub use stats::LatencyStats;
