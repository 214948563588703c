//! Per-file work unit and the bounded fan-out over all files.

use super::GenerateConfig;
use anyhow::Context;
use async_trait::async_trait;
use futures::StreamExt;
use readings_generator::{gzip_file, FileAssignment, ReadingsWriter};
use readings_loader::ImportSummary;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Destination of compressed files: staging storage plus the database import.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Upload a compressed file under `object_name`.
    async fn stage(&self, local_path: &Path, object_name: &str) -> anyhow::Result<()>;

    /// Import a staged object into the database.
    async fn import(&self, object_name: &str) -> anyhow::Result<ImportSummary>;

    /// Remove a staged object once it has been imported.
    async fn discard(&self, object_name: &str) -> anyhow::Result<()>;
}

/// Outcome of one successfully processed file.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub assignment: FileAssignment,
    pub rows_written: u64,
    pub compressed_bytes: u64,
    /// Row count reported by the import, if an import ran and reported one.
    pub rows_imported: Option<u64>,
    /// Compressed file left on disk in local-only mode.
    pub local_file: Option<PathBuf>,
    pub duration: Duration,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default)]
pub struct GenerateReport {
    /// Successful files, ordered by file index.
    pub files: Vec<FileReport>,
    pub errors: Vec<String>,
    pub wall_clock: Duration,
}

impl GenerateReport {
    pub fn total_rows_written(&self) -> u64 {
        self.files.iter().map(|f| f.rows_written).sum()
    }

    pub fn total_rows_imported(&self) -> u64 {
        self.files.iter().filter_map(|f| f.rows_imported).sum()
    }

    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Process every file of the run with at most `config.workers` in flight.
///
/// A failed file is logged and recorded in [`GenerateReport::errors`]; the
/// remaining files still run. Without a sink, files are only generated and
/// compressed.
pub async fn run_pipeline(
    config: &GenerateConfig,
    sink: Option<Arc<dyn ArtifactSink>>,
) -> anyhow::Result<GenerateReport> {
    config.validate()?;
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create output directory {}",
                config.output_dir.display()
            )
        })?;

    let start = Instant::now();
    let results: Vec<(FileAssignment, anyhow::Result<FileReport>)> =
        futures::stream::iter(config.assignments())
            .map(|assignment| {
                let config = config.clone();
                let sink = sink.clone();
                async move {
                    let handle = tokio::spawn(async move {
                        run_unit(assignment, &config, sink.as_deref()).await
                    });
                    let result = match handle.await {
                        Ok(result) => result,
                        Err(e) => Err(anyhow::anyhow!("Worker task failed: {e}")),
                    };
                    (assignment, result)
                }
            })
            .buffer_unordered(config.workers)
            .collect()
            .await;

    let mut report = GenerateReport {
        wall_clock: start.elapsed(),
        ..GenerateReport::default()
    };
    for (assignment, result) in results {
        match result {
            Ok(file) => report.files.push(file),
            Err(e) => {
                let message = format!("File {} failed: {e:#}", assignment.file_index);
                error!("{}", message);
                report.errors.push(message);
            }
        }
    }
    report.files.sort_by_key(|f| f.assignment.file_index);

    Ok(report)
}

async fn run_unit(
    assignment: FileAssignment,
    config: &GenerateConfig,
    sink: Option<&dyn ArtifactSink>,
) -> anyhow::Result<FileReport> {
    match config.task_timeout {
        Some(limit) => tokio::time::timeout(limit, process_file(assignment, config, sink))
            .await
            .map_err(|_| anyhow::anyhow!("Timed out after {limit:?}"))?,
        None => process_file(assignment, config, sink).await,
    }
}

/// Generate, compress, stage, import and clean up one file.
async fn process_file(
    assignment: FileAssignment,
    config: &GenerateConfig,
    sink: Option<&dyn ArtifactSink>,
) -> anyhow::Result<FileReport> {
    let start = Instant::now();
    let csv_path = config.output_dir.join(assignment.csv_file_name());
    let gzip_path = config.output_dir.join(assignment.gzip_file_name());

    // Record synthesis is CPU bound.
    let write_metrics = {
        let path = csv_path.clone();
        let span = config.span;
        let seed = assignment.seed(config.seed);
        tokio::task::spawn_blocking(move || {
            ReadingsWriter::new(assignment, span, seed).write_file(&path)
        })
        .await
        .context("Generation task failed")?
        .with_context(|| format!("Failed to generate {}", csv_path.display()))?
    };

    info!("GZipping file: {}", csv_path.display());
    let compress_metrics = gzip_file(&csv_path, &gzip_path)
        .await
        .with_context(|| format!("Failed to compress {}", csv_path.display()))?;
    tokio::fs::remove_file(&csv_path)
        .await
        .with_context(|| format!("Failed to remove {}", csv_path.display()))?;

    let mut report = FileReport {
        assignment,
        rows_written: write_metrics.rows_written,
        compressed_bytes: compress_metrics.bytes_out,
        rows_imported: None,
        local_file: None,
        duration: Duration::ZERO,
    };

    let Some(sink) = sink else {
        info!("Kept compressed file: {}", gzip_path.display());
        report.local_file = Some(gzip_path);
        report.duration = start.elapsed();
        return Ok(report);
    };

    let object_name = assignment.gzip_file_name();
    info!("Uploading: {}", gzip_path.display());
    sink.stage(&gzip_path, &object_name)
        .await
        .with_context(|| format!("Failed to upload {}", gzip_path.display()))?;
    info!("Successfully uploaded: {}", gzip_path.display());
    tokio::fs::remove_file(&gzip_path)
        .await
        .with_context(|| format!("Failed to remove {}", gzip_path.display()))?;

    let summary = sink
        .import(&object_name)
        .await
        .with_context(|| format!("Failed to import {object_name}"))?;
    report.rows_imported = summary.rows_imported;

    sink.discard(&object_name)
        .await
        .with_context(|| format!("Failed to delete staged object {object_name}"))?;

    report.duration = start.elapsed();
    info!(
        "File {} done: {} rows in {:?}",
        assignment.file_index, report.rows_written, report.duration
    );

    Ok(report)
}
