//! Bounded fan-out of randomized queries.

use crate::error::QueryBenchError;
use crate::query::{QueryBounds, QueryExecutor, QueryPlan, QuerySample};
use futures::StreamExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Harness settings.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Maximum number of queries in flight.
    pub concurrency: usize,
    /// Total number of queries to run.
    pub query_count: usize,
    pub bounds: QueryBounds,
    /// Seed for the query plans; a random seed is used when absent.
    pub seed: Option<u64>,
    /// Per-query limit; unbounded when absent.
    pub task_timeout: Option<Duration>,
}

/// Merged results of a harness run.
#[derive(Debug, Clone, Default)]
pub struct HarnessOutcome {
    /// Latency of each successful query, in seconds.
    pub samples: Vec<f64>,
    pub rows_fetched: u64,
    pub failures: Vec<String>,
    pub wall_clock: Duration,
}

impl HarnessOutcome {
    pub fn queries_per_second(&self) -> f64 {
        if self.wall_clock.as_secs_f64() > 0.0 {
            self.samples.len() as f64 / self.wall_clock.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Run `query_count` random plans with at most `concurrency` in flight.
///
/// Each query is its own task and returns its sample; samples are merged
/// once every task has finished. Failed queries are recorded and do not
/// stop the others.
pub async fn run_queries(executor: Arc<dyn QueryExecutor>, config: &HarnessConfig) -> HarnessOutcome {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    let plans: Vec<QueryPlan> = (0..config.query_count)
        .map(|_| QueryPlan::random(&mut rng, &config.bounds))
        .collect();

    info!(
        "Running {} queries with concurrency {}",
        plans.len(),
        config.concurrency
    );

    let start = Instant::now();
    let task_timeout = config.task_timeout;
    let results: Vec<(usize, Result<QuerySample, QueryBenchError>)> =
        futures::stream::iter(plans.into_iter().enumerate())
            .map(|(index, plan)| {
                let executor = Arc::clone(&executor);
                async move {
                    let handle =
                        tokio::spawn(async move { run_one(executor, plan, task_timeout).await });
                    let result = match handle.await {
                        Ok(result) => result,
                        Err(e) => Err(QueryBenchError::Task(e.to_string())),
                    };
                    (index, result)
                }
            })
            .buffer_unordered(config.concurrency.max(1))
            .collect()
            .await;

    let mut outcome = HarnessOutcome {
        wall_clock: start.elapsed(),
        ..HarnessOutcome::default()
    };
    for (index, result) in results {
        match result {
            Ok(sample) => {
                outcome.samples.push(sample.elapsed.as_secs_f64());
                outcome.rows_fetched += sample.rows as u64;
            }
            Err(e) => {
                let message = format!("Query {index} failed: {e}");
                warn!("{}", message);
                outcome.failures.push(message);
            }
        }
    }

    info!(
        "Completed {} queries ({} failed) in {:?}",
        outcome.samples.len(),
        outcome.failures.len(),
        outcome.wall_clock
    );

    outcome
}

async fn run_one(
    executor: Arc<dyn QueryExecutor>,
    plan: QueryPlan,
    task_timeout: Option<Duration>,
) -> Result<QuerySample, QueryBenchError> {
    match task_timeout {
        Some(limit) => tokio::time::timeout(limit, executor.execute(&plan))
            .await
            .map_err(|_| QueryBenchError::Timeout(limit))?,
        None => executor.execute(&plan).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Executor that records concurrency and fails for chosen meter ids.
    struct FakeExecutor {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        fail_even_nmi: bool,
        delay: Duration,
    }

    impl FakeExecutor {
        fn new(delay: Duration, fail_even_nmi: bool) -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                fail_even_nmi,
                delay,
            }
        }
    }

    #[async_trait]
    impl QueryExecutor for FakeExecutor {
        async fn execute(&self, plan: &QueryPlan) -> Result<QuerySample, QueryBenchError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_even_nmi && plan.nmi % 2 == 0 {
                return Err(QueryBenchError::Task(format!("nmi {}", plan.nmi)));
            }
            Ok(QuerySample {
                rows: 3,
                elapsed: self.delay,
            })
        }
    }

    fn config(concurrency: usize, query_count: usize) -> HarnessConfig {
        HarnessConfig {
            concurrency,
            query_count,
            bounds: QueryBounds::new(1_000, NaiveDate::from_ymd_opt(2003, 8, 1).unwrap()),
            seed: Some(42),
            task_timeout: None,
        }
    }

    #[tokio::test]
    async fn test_all_samples_collected() {
        let executor = Arc::new(FakeExecutor::new(Duration::from_millis(2), false));
        let outcome = run_queries(executor.clone(), &config(4, 40)).await;

        assert_eq!(outcome.samples.len(), 40);
        assert_eq!(outcome.rows_fetched, 120);
        assert!(outcome.failures.is_empty());
        assert!(executor.peak.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let executor = Arc::new(FakeExecutor::new(Duration::from_millis(20), false));
        let outcome = run_queries(executor.clone(), &config(3, 12)).await;

        assert_eq!(outcome.samples.len(), 12);
        let peak = executor.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency {peak}");
        assert!(outcome.queries_per_second() > 0.0);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_siblings() {
        let executor = Arc::new(FakeExecutor::new(Duration::from_millis(1), true));
        let outcome = run_queries(executor, &config(2, 50)).await;

        assert_eq!(outcome.samples.len() + outcome.failures.len(), 50);
        assert!(!outcome.failures.is_empty());
        assert!(!outcome.samples.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let executor = Arc::new(FakeExecutor::new(Duration::from_millis(200), false));
        let mut config = config(2, 4);
        config.task_timeout = Some(Duration::from_millis(10));
        let outcome = run_queries(executor, &config).await;

        assert!(outcome.samples.is_empty());
        assert_eq!(outcome.failures.len(), 4);
        assert!(outcome.failures[0].contains("timed out"));
    }

    #[tokio::test]
    async fn test_zero_queries() {
        let executor = Arc::new(FakeExecutor::new(Duration::ZERO, false));
        let outcome = run_queries(executor, &config(4, 0)).await;
        assert!(outcome.samples.is_empty());
        assert!(outcome.failures.is_empty());
    }
}
