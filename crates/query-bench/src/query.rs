//! Randomized range queries against the readings table.

use crate::error::QueryBenchError;
use crate::pool::ConnectionPool;
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use rand::Rng;
use std::ops::RangeInclusive;
use std::time::{Duration, Instant};
use tokio_postgres::types::{ToSql, Type};
use tracing::debug;

/// Default upper bound for randomly chosen meter ids.
pub const DEFAULT_MAX_NMI: u64 = 500_000;

const START_OFFSET_DAYS: RangeInclusive<u64> = 0..=300;
const END_OFFSET_DAYS: RangeInclusive<u64> = 301..=700;

/// Ranges the random query parameters are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryBounds {
    pub max_nmi: u64,
    pub base_date: NaiveDate,
}

impl QueryBounds {
    pub fn new(max_nmi: u64, base_date: NaiveDate) -> Self {
        Self { max_nmi, base_date }
    }
}

/// Parameters of one range query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryPlan {
    pub nmi: u64,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl QueryPlan {
    /// Draw a meter id in `[1, max_nmi]`, a start 0-300 days after the base
    /// date and an end 301-700 days after it, so `start < end` always holds.
    pub fn random<R: Rng>(rng: &mut R, bounds: &QueryBounds) -> Self {
        let nmi = rng.random_range(1..=bounds.max_nmi.max(1));
        let start = offset_date(bounds.base_date, rng.random_range(START_OFFSET_DAYS));
        let end = offset_date(bounds.base_date, rng.random_range(END_OFFSET_DAYS));
        Self { nmi, start, end }
    }
}

fn offset_date(base: NaiveDate, days: u64) -> NaiveDate {
    base.checked_add_days(Days::new(days))
        .unwrap_or(NaiveDate::MAX)
}

/// Range select over one meter; both date bounds are exclusive.
///
/// `table` may be schema qualified (`public.readings`); each part is quoted.
pub fn range_query_sql(table: &str) -> String {
    format!(
        "SELECT * FROM {} WHERE nmi = $1 AND interval_date > $2::date AND interval_date < $3::date",
        quote_table(table)
    )
}

fn quote_table(table: &str) -> String {
    table
        .split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

/// Result of one executed query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuerySample {
    pub rows: usize,
    pub elapsed: Duration,
}

/// Something that can run a [`QueryPlan`] and time it.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, plan: &QueryPlan) -> Result<QuerySample, QueryBenchError>;
}

/// Runs plans on a shared [`ConnectionPool`].
pub struct PgQueryExecutor {
    pool: ConnectionPool,
    sql: String,
}

impl PgQueryExecutor {
    pub fn new(pool: ConnectionPool, table: &str) -> Self {
        Self {
            pool,
            sql: range_query_sql(table),
        }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }
}

#[async_trait]
impl QueryExecutor for PgQueryExecutor {
    async fn execute(&self, plan: &QueryPlan) -> Result<QuerySample, QueryBenchError> {
        let client = self.pool.checkout().await?;

        // Preparation is not part of the measured latency.
        let statement = client.prepare(&self.sql).await?;
        let nmi_type = statement
            .params()
            .first()
            .cloned()
            .unwrap_or(Type::TEXT);
        let nmi = nmi_param(&nmi_type, plan.nmi)?;
        let params: [&(dyn ToSql + Sync); 3] = [nmi.as_ref(), &plan.start, &plan.end];

        let start = Instant::now();
        let rows = client.query(&statement, &params).await?;
        let elapsed = start.elapsed();

        debug!(
            "nmi={} {}..{} returned {} rows in {:?}",
            plan.nmi,
            plan.start,
            plan.end,
            rows.len(),
            elapsed
        );

        Ok(QuerySample {
            rows: rows.len(),
            elapsed,
        })
    }
}

/// Bind the meter id according to the column type the server inferred.
fn nmi_param(column_type: &Type, nmi: u64) -> Result<Box<dyn ToSql + Sync + Send>, QueryBenchError> {
    let out_of_range = || QueryBenchError::NmiOutOfRange {
        nmi,
        column_type: column_type.to_string(),
    };

    if *column_type == Type::INT8 {
        Ok(Box::new(i64::try_from(nmi).map_err(|_| out_of_range())?))
    } else if *column_type == Type::INT4 {
        Ok(Box::new(i32::try_from(nmi).map_err(|_| out_of_range())?))
    } else if *column_type == Type::INT2 {
        Ok(Box::new(i16::try_from(nmi).map_err(|_| out_of_range())?))
    } else if *column_type == Type::TEXT
        || *column_type == Type::VARCHAR
        || *column_type == Type::BPCHAR
    {
        Ok(Box::new(nmi.to_string()))
    } else {
        Err(QueryBenchError::UnsupportedNmiType(column_type.to_string()))
    }
}
