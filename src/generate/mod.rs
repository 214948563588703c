//! `generate` command: synthesize, compress, stage and bulk-load reading files.

mod pipeline;
mod sink;

pub use pipeline::{run_pipeline, ArtifactSink, FileReport, GenerateReport};
pub use sink::S3ImportSink;

use crate::config::parse_duration;
use crate::DbCredentials;
use anyhow::Context;
use chrono::NaiveDate;
use clap::Args;
use readings_generator::{DateSpan, FileAssignment, DEFAULT_DAYS};
use readings_loader::{DEFAULT_REGION, DEFAULT_TABLE};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Arguments of the `generate` command.
#[derive(Args, Clone, Debug)]
pub struct GenerateArgs {
    /// Number of files to generate
    #[arg(long, env = "FILE_COUNT")]
    pub file_count: u64,

    /// Number of meters (NMIs) per file
    #[arg(long, env = "NMI_PER_FILE")]
    pub nmi_per_file: u64,

    /// Number of files processed concurrently
    #[arg(long, env = "WORKER_THREADS")]
    pub worker_threads: usize,

    /// Bucket the compressed files are staged in
    #[arg(long, env = "BUCKET_NAME", required_unless_present = "local_only")]
    pub bucket: Option<String>,

    /// Region of the bucket, as passed to the import procedure
    #[arg(long, env = "S3_REGION", default_value = DEFAULT_REGION)]
    pub s3_region: String,

    /// Writer database host
    #[arg(long, env = "DB_HOST", required_unless_present = "local_only")]
    pub db_host: Option<String>,

    #[command(flatten)]
    pub db: DbCredentials,

    /// Destination table
    #[arg(long, default_value = DEFAULT_TABLE)]
    pub table: String,

    /// Directory for intermediate files
    #[arg(long, default_value = "./output")]
    pub output_dir: PathBuf,

    /// First reading date (YYYY-MM-DD)
    #[arg(long, default_value = "2003-08-01")]
    pub start_date: NaiveDate,

    /// Number of days of readings per meter
    #[arg(long, default_value_t = DEFAULT_DAYS)]
    pub days: u32,

    /// Random seed for deterministic generation (file i uses seed + i)
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Only generate and compress; keep the files and skip upload and import
    #[arg(long)]
    pub local_only: bool,

    /// Per-file time limit (e.g. "90s", "30m"); unbounded when omitted
    #[arg(long, value_parser = parse_duration)]
    pub task_timeout: Option<Duration>,
}

impl GenerateArgs {
    /// Validate the arguments and build the pipeline configuration.
    pub fn config(&self) -> anyhow::Result<GenerateConfig> {
        let config = GenerateConfig {
            file_count: self.file_count,
            nmi_per_file: self.nmi_per_file,
            workers: self.worker_threads,
            output_dir: self.output_dir.clone(),
            span: DateSpan::new(self.start_date, self.days),
            seed: self.seed,
            task_timeout: self.task_timeout,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Explicit configuration of one generate run.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub file_count: u64,
    pub nmi_per_file: u64,
    pub workers: usize,
    pub output_dir: PathBuf,
    pub span: DateSpan,
    pub seed: u64,
    pub task_timeout: Option<Duration>,
}

impl GenerateConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.workers == 0 {
            anyhow::bail!("worker threads must be at least 1");
        }
        if self.nmi_per_file == 0 {
            anyhow::bail!("NMIs per file must be at least 1");
        }
        if self.span.days() == 0 {
            anyhow::bail!("days must be at least 1");
        }
        if self.span.last_date().is_none() {
            anyhow::bail!(
                "{} days from {} runs past the supported date range",
                self.span.days(),
                self.span.start()
            );
        }
        self.file_count
            .checked_mul(self.nmi_per_file)
            .context("file count * NMIs per file overflows the meter id space")?;
        Ok(())
    }

    /// One assignment per output file, in index order.
    pub fn assignments(&self) -> impl Iterator<Item = FileAssignment> {
        let nmi_per_file = self.nmi_per_file;
        (0..self.file_count).map(move |index| FileAssignment::new(index, nmi_per_file))
    }

    /// Records the whole run is expected to produce.
    pub fn expected_records(&self) -> u64 {
        self.assignments()
            .map(|assignment| assignment.record_count(&self.span))
            .sum()
    }
}

/// Run the generate command.
pub async fn run_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let config = args.config()?;

    let sink: Option<Arc<dyn ArtifactSink>> = if args.local_only {
        tracing::info!(
            "Local-only mode: files are kept in {} and not uploaded",
            config.output_dir.display()
        );
        None
    } else {
        Some(Arc::new(S3ImportSink::connect(&args).await?))
    };

    tracing::info!(
        "Generating {} files of {} meters over {} days with {} workers (seed={})",
        config.file_count,
        config.nmi_per_file,
        config.span.days(),
        config.workers,
        config.seed
    );

    let report = run_pipeline(&config, sink).await?;

    tracing::info!(
        "Processed {} files: {} rows written, {} rows imported in {:?}",
        report.files.len(),
        report.total_rows_written(),
        report.total_rows_imported(),
        report.wall_clock
    );

    if !report.errors.is_empty() {
        anyhow::bail!("Generate failed with {} error(s)", report.errors.len());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GenerateConfig {
        GenerateConfig {
            file_count: 3,
            nmi_per_file: 4,
            workers: 2,
            output_dir: PathBuf::from("./output"),
            span: DateSpan::new(NaiveDate::from_ymd_opt(2003, 8, 1).unwrap(), 730),
            seed: 42,
            task_timeout: None,
        }
    }

    #[test]
    fn test_assignments_tile_meter_ids() {
        let ranges: Vec<_> = config().assignments().map(|a| a.nmi_range()).collect();
        assert_eq!(ranges, vec![1..=4, 5..=8, 9..=12]);
    }

    #[test]
    fn test_expected_records() {
        assert_eq!(config().expected_records(), 3 * 4 * 730 * 2);
    }

    #[test]
    fn test_validate() {
        assert!(config().validate().is_ok());

        let mut bad = config();
        bad.workers = 0;
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.nmi_per_file = 0;
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.span = DateSpan::new(bad.span.start(), 0);
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.file_count = u64::MAX;
        bad.nmi_per_file = 2;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_span_past_date_range() {
        let mut bad = config();
        bad.span = DateSpan::new(NaiveDate::MAX, 2);
        let err = bad.validate().unwrap_err().to_string();
        assert!(err.contains("runs past the supported date range"), "{err}");

        let mut edge = config();
        edge.span = DateSpan::new(NaiveDate::MAX, 1);
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_zero_files_is_valid() {
        let mut empty = config();
        empty.file_count = 0;
        assert!(empty.validate().is_ok());
        assert_eq!(empty.assignments().count(), 0);
    }
}
