//! Gzip compression of generated files.

use crate::error::GeneratorError;
use crate::DEFAULT_BUFFER_SIZE;
use async_compression::tokio::bufread::GzipDecoder;
use async_compression::tokio::write::GzipEncoder;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};

/// Metrics from compressing one file.
#[derive(Debug, Clone, Default)]
pub struct CompressMetrics {
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub duration: Duration,
}

impl CompressMetrics {
    /// Compressed size as a fraction of the input size.
    pub fn ratio(&self) -> f64 {
        if self.bytes_in > 0 {
            self.bytes_out as f64 / self.bytes_in as f64
        } else {
            0.0
        }
    }
}

/// Gzip `source` into `target`, replacing `target` if it exists.
pub async fn gzip_file(source: &Path, target: &Path) -> Result<CompressMetrics, GeneratorError> {
    let start = Instant::now();

    let mut input = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, File::open(source).await?);
    let output = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, File::create(target).await?);
    let mut encoder = GzipEncoder::new(output);

    let bytes_in = tokio::io::copy(&mut input, &mut encoder).await?;
    // Writes the gzip trailer and flushes the file.
    encoder.shutdown().await?;

    let bytes_out = tokio::fs::metadata(target).await?.len();

    Ok(CompressMetrics {
        bytes_in,
        bytes_out,
        duration: start.elapsed(),
    })
}

/// Decompress a gzip file fully into memory.
pub async fn gunzip_to_vec(source: &Path) -> Result<Vec<u8>, GeneratorError> {
    let input = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, File::open(source).await?);
    let mut decoder = GzipDecoder::new(input);
    let mut content = Vec::new();
    decoder.read_to_end(&mut content).await?;
    Ok(content)
}
