//! `load-test` command: concurrent randomized range reads with latency stats.

mod report;

pub use report::{append_result, format_summary};

use crate::config::parse_duration;
use crate::connect::{connection_string, mask_connection_password};
use crate::DbCredentials;
use anyhow::Context;
use chrono::NaiveDate;
use clap::Args;
use query_bench::{
    run_queries, ConnectionPool, HarnessConfig, LatencyStats, PgQueryExecutor, QueryBounds,
    QueryExecutor, DEFAULT_MAX_NMI,
};
use readings_loader::DEFAULT_TABLE;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Arguments of the `load-test` command.
#[derive(Args, Clone, Debug)]
pub struct LoadTestArgs {
    /// Read replica host
    #[arg(long, env = "DB_READONLY_HOST")]
    pub db_readonly_host: String,

    /// Connection pool size and number of concurrent queries
    #[arg(long, env = "LOAD_THREADS")]
    pub load_threads: usize,

    #[command(flatten)]
    pub db: DbCredentials,

    /// Total number of queries (defaults to --load-threads)
    #[arg(long)]
    pub query_count: Option<usize>,

    /// Largest meter id to query
    #[arg(long, default_value_t = DEFAULT_MAX_NMI)]
    pub max_nmi: u64,

    /// Date the random query windows are offset from (YYYY-MM-DD)
    #[arg(long, default_value = "2003-08-01")]
    pub start_date: NaiveDate,

    /// Table to query
    #[arg(long, default_value = DEFAULT_TABLE)]
    pub table: String,

    /// CSV file the summary line is appended to
    #[arg(long, default_value = "./output/load_test_result.csv")]
    pub result_file: PathBuf,

    /// Random seed for the query plans; random when omitted
    #[arg(long)]
    pub seed: Option<u64>,

    /// Per-query time limit (e.g. "30s"); unbounded when omitted
    #[arg(long, value_parser = parse_duration)]
    pub task_timeout: Option<Duration>,
}

impl LoadTestArgs {
    /// Validate the arguments and build the run configuration.
    pub fn config(&self) -> anyhow::Result<LoadTestConfig> {
        if self.load_threads == 0 {
            anyhow::bail!("load threads must be at least 1");
        }
        if self.max_nmi == 0 {
            anyhow::bail!("max NMI must be at least 1");
        }

        Ok(LoadTestConfig {
            threads: self.load_threads,
            table: self.table.clone(),
            result_file: self.result_file.clone(),
            harness: HarnessConfig {
                concurrency: self.load_threads,
                query_count: self.query_count.unwrap_or(self.load_threads),
                bounds: QueryBounds::new(self.max_nmi, self.start_date),
                seed: self.seed,
                task_timeout: self.task_timeout,
            },
        })
    }
}

/// Explicit configuration of one load test run.
#[derive(Debug, Clone)]
pub struct LoadTestConfig {
    pub threads: usize,
    pub table: String,
    pub result_file: PathBuf,
    pub harness: HarnessConfig,
}

/// Run the load-test command.
pub async fn run_load_test(args: LoadTestArgs) -> anyhow::Result<()> {
    let config = args.config()?;

    let conn = connection_string(&args.db_readonly_host, &args.db);
    tracing::info!(
        "Opening {} connections to {}",
        config.threads,
        mask_connection_password(&conn)
    );
    let pool = ConnectionPool::connect(&conn, config.threads)
        .await
        .context("Failed to open the connection pool")?;

    let executor: Arc<dyn QueryExecutor> = Arc::new(PgQueryExecutor::new(pool, &config.table));
    let outcome = run_queries(executor, &config.harness).await;

    let stats = LatencyStats::from_samples(&outcome.samples).with_context(|| {
        format!(
            "Cannot summarize latencies: {} of {} queries succeeded",
            outcome.samples.len(),
            config.harness.query_count
        )
    })?;

    append_result(&config.result_file, config.threads, &stats)?;
    tracing::info!("Appended result to {}", config.result_file.display());

    println!("{}", format_summary(config.threads, &stats, &outcome));

    if !outcome.failures.is_empty() {
        anyhow::bail!("Load test failed with {} error(s)", outcome.failures.len());
    }

    Ok(())
}
