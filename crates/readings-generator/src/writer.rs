//! Delimited file writer for generated readings.

use crate::error::GeneratorError;
use crate::record::{DateSpan, FileAssignment, RecordGenerator};
use crate::DEFAULT_BUFFER_SIZE;
use csv::{QuoteStyle, WriterBuilder};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Field delimiter understood by the bulk import (`DELIMITER '|'`).
pub const DELIMITER: u8 = b'|';

/// Metrics from writing one readings file.
#[derive(Debug, Clone, Default)]
pub struct WriteMetrics {
    /// Number of records written.
    pub rows_written: u64,
    /// Output file size in bytes.
    pub file_size_bytes: u64,
    /// Total time taken.
    pub total_duration: Duration,
}

impl WriteMetrics {
    /// Calculate rows per second.
    pub fn rows_per_second(&self) -> f64 {
        if self.total_duration.as_secs_f64() > 0.0 {
            self.rows_written as f64 / self.total_duration.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Writes the records of one [`FileAssignment`] to disk.
pub struct ReadingsWriter {
    generator: RecordGenerator,
}

impl ReadingsWriter {
    pub fn new(assignment: FileAssignment, span: DateSpan, seed: u64) -> Self {
        Self {
            generator: RecordGenerator::new(assignment, span, seed),
        }
    }

    /// Write every record to `output_path`, replacing any existing file.
    ///
    /// The output has no header and no quoting; the array literals contain
    /// commas but never the `|` delimiter.
    pub fn write_file<P: AsRef<Path>>(
        &mut self,
        output_path: P,
    ) -> Result<WriteMetrics, GeneratorError> {
        let start_time = Instant::now();
        let mut metrics = WriteMetrics::default();
        let output_path = output_path.as_ref();

        let assignment = self.generator.assignment();
        info!(
            "Preparing file '{}' for meters {:?}",
            output_path.display(),
            assignment.nmi_range()
        );

        let file = File::create(output_path)?;
        let buf_writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file);
        let mut writer = WriterBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(false)
            .quote_style(QuoteStyle::Never)
            .from_writer(buf_writer);

        for record in self.generator.records() {
            writer.write_record(record.to_fields())?;
            metrics.rows_written += 1;

            if metrics.rows_written % 100_000 == 0 {
                debug!(
                    "Written {} rows to '{}'",
                    metrics.rows_written,
                    output_path.display()
                );
            }
        }

        writer.flush()?;
        let inner = writer
            .into_inner()
            .map_err(|e| GeneratorError::Io(std::io::Error::other(e.to_string())))?;
        drop(inner);

        metrics.file_size_bytes = std::fs::metadata(output_path)?.len();
        metrics.total_duration = start_time.elapsed();

        debug!(
            "Wrote {} rows, {} bytes in {:?} ({:.2} rows/sec)",
            metrics.rows_written,
            metrics.file_size_bytes,
            metrics.total_duration,
            metrics.rows_per_second()
        );

        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn span(days: u32) -> DateSpan {
        DateSpan::new(NaiveDate::from_ymd_opt(2003, 8, 1).unwrap(), days)
    }

    #[test]
    fn test_metrics() {
        let metrics = WriteMetrics {
            rows_written: 1000,
            file_size_bytes: 100_000,
            total_duration: Duration::from_secs(10),
        };
        assert_eq!(metrics.rows_per_second(), 100.0);
        assert_eq!(WriteMetrics::default().rows_per_second(), 0.0);
    }

    #[test]
    fn test_write_file_layout() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("readings_0.csv");

        let mut writer = ReadingsWriter::new(FileAssignment::new(0, 2), span(3), 42);
        let metrics = writer.write_file(&path).unwrap();

        assert_eq!(metrics.rows_written, 12);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.ends_with('\n'));
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 12);

        let fields: Vec<&str> = lines[0].split('|').collect();
        assert_eq!(fields.len(), 6);
        assert_eq!(fields[0], "1");
        assert_eq!(fields[1], "2003-08-01");
        assert_eq!(fields[2], "I");
        assert!(fields[3].starts_with('{') && fields[3].ends_with('}'));
        assert_eq!(fields[5], "{0,1,2,3,4,5,6,7,8,9}");
        assert!(lines[1].starts_with("1|2003-08-01|E|"));
        assert!(lines[11].starts_with("2|2003-08-03|E|"));
        assert_eq!(metrics.file_size_bytes, content.len() as u64);
    }

    #[test]
    fn test_write_file_replaces_stale_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("readings_1.csv");
        std::fs::write(&path, "stale line\n").unwrap();

        ReadingsWriter::new(FileAssignment::new(1, 1), span(2), 42)
            .write_file(&path)
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("stale"));
        assert_eq!(content.lines().count(), 4);
    }

    #[test]
    fn test_same_seed_same_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("a.csv");
        let second = temp_dir.path().join("b.csv");

        ReadingsWriter::new(FileAssignment::new(3, 4), span(30), 5)
            .write_file(&first)
            .unwrap();
        ReadingsWriter::new(FileAssignment::new(3, 4), span(30), 5)
            .write_file(&second)
            .unwrap();

        assert_eq!(std::fs::read(first).unwrap(), std::fs::read(second).unwrap());
    }
}
