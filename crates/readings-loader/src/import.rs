//! `aws_s3.table_import_from_s3` invocation.

use crate::error::LoaderError;
use std::time::{Duration, Instant};
use tokio_postgres::{Client, NoTls};
use tracing::{debug, info};

/// Default destination table.
pub const DEFAULT_TABLE: &str = "readings";

/// Default region passed to `aws_commons.create_s3_uri`.
pub const DEFAULT_REGION: &str = "ap-southeast-2";

const RELAXED_DURABILITY_SQL: &str = "SET LOCAL synchronous_commit TO OFF";

const IMPORT_SQL: &str = "SELECT aws_s3.table_import_from_s3(\
     $1::text, $2::text, $3::text, \
     aws_commons.create_s3_uri($4::text, $5::text, $6::text))";

/// Destination of an import: table, column order, delimiter and bucket region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportTarget {
    pub table: String,
    pub columns: Vec<String>,
    pub delimiter: char,
    pub region: String,
}

impl ImportTarget {
    pub fn new<I, S>(
        table: impl Into<String>,
        columns: I,
        delimiter: char,
        region: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            delimiter,
            region: region.into(),
        }
    }

    /// Comma separated column list, as the import procedure expects it.
    pub fn column_list(&self) -> String {
        self.columns.join(",")
    }

    /// `COPY` options string.
    pub fn copy_options(&self) -> String {
        let delimiter = if self.delimiter == '\'' {
            "''".to_string()
        } else {
            self.delimiter.to_string()
        };
        format!("DELIMITER '{delimiter}'")
    }
}

/// Outcome of one import.
#[derive(Debug, Clone)]
pub struct ImportSummary {
    /// Status text returned by the import procedure.
    pub status: String,
    /// Row count parsed from the status, when present.
    pub rows_imported: Option<u64>,
    pub duration: Duration,
}

impl ImportSummary {
    fn from_status(status: String, duration: Duration) -> Self {
        let rows_imported = parse_rows_imported(&status);
        Self {
            status,
            rows_imported,
            duration,
        }
    }
}

/// Extract the leading row count from a status such as
/// `"1460 rows imported into relation \"readings\" from file ..."`.
fn parse_rows_imported(status: &str) -> Option<u64> {
    status.split_whitespace().next()?.parse().ok()
}

/// Imports staged objects into the readings table.
pub struct BulkLoader {
    connection_string: String,
    target: ImportTarget,
}

impl BulkLoader {
    /// Create a loader.
    ///
    /// # Arguments
    ///
    /// * `connection_string` - PostgreSQL connection string (e.g., "host=localhost user=postgres password=postgres dbname=meters")
    /// * `target` - Destination table and import options
    pub fn new(connection_string: impl Into<String>, target: ImportTarget) -> Self {
        Self {
            connection_string: connection_string.into(),
            target,
        }
    }

    pub fn target(&self) -> &ImportTarget {
        &self.target
    }

    async fn connect(&self) -> Result<Client, LoaderError> {
        let (client, connection) = tokio_postgres::connect(&self.connection_string, NoTls).await?;

        // Spawn the connection task
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {}", e);
            }
        });

        Ok(client)
    }

    /// Open a connection and run a trivial query.
    pub async fn check_connection(&self) -> Result<(), LoaderError> {
        let client = self.connect().await?;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }

    /// Import one object in its own transaction.
    ///
    /// Durability is relaxed for the transaction only; the commit still
    /// happens before this returns.
    pub async fn import_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<ImportSummary, LoaderError> {
        let start = Instant::now();
        let mut client = self.connect().await?;
        let transaction = client.transaction().await?;

        debug!("Setting synchronous_commit to off for '{}'", key);
        transaction.batch_execute(RELAXED_DURABILITY_SQL).await?;

        info!("Loading to DB: {} -> {}", key, self.target.table);
        let column_list = self.target.column_list();
        let options = self.target.copy_options();
        let row = transaction
            .query_one(
                IMPORT_SQL,
                &[
                    &self.target.table,
                    &column_list,
                    &options,
                    &bucket,
                    &key,
                    &self.target.region,
                ],
            )
            .await?;
        let status: Option<String> = row.try_get(0)?;
        let status = status.ok_or_else(|| LoaderError::MissingStatus(key.to_string()))?;

        transaction.commit().await?;

        let summary = ImportSummary::from_status(status, start.elapsed());
        info!("Import of '{}' finished: {}", key, summary.status);
        Ok(summary)
    }
}
