//! Synthetic meter reading generator.
//!
//! Each output file is described by a [`FileAssignment`]: a file index and a
//! per-file meter count, which together select a closed range of meter ids
//! (NMIs). Every meter receives one Import and one Export reading per day
//! across a [`DateSpan`].
//!
//! # Example
//!
//! ```ignore
//! use readings_generator::{DateSpan, FileAssignment, ReadingsWriter};
//!
//! let assignment = FileAssignment::new(3, 100);
//! let span = DateSpan::new(start_date, 730);
//! let metrics = ReadingsWriter::new(assignment, span, 42).write_file("out/readings_3.csv")?;
//! gzip_file("out/readings_3.csv".as_ref(), "out/readings_3.csv.gz".as_ref()).await?;
//! ```

mod compress;
mod error;
mod record;
mod writer;

pub use compress::{gunzip_to_vec, gzip_file, CompressMetrics};
pub use error::GeneratorError;
pub use record::{
    DateSpan, DayIdSet, Direction, FileAssignment, IntervalSet, ReadingRecord, RecordGenerator,
    Records, COLUMNS, DEFAULT_DAYS,
};
pub use writer::{ReadingsWriter, WriteMetrics, DELIMITER};

/// Default buffer size for file IO (1MB).
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;
