//! Reading records and the per-file record synthesizer.

use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::ops::{Range, RangeInclusive};

/// Default number of days covered by each meter (two years).
pub const DEFAULT_DAYS: u32 = 730;

/// Column list of the readings table, in file order.
pub const COLUMNS: [&str; 6] = [
    "nmi",
    "interval_date",
    "direction",
    "nmi_day_id",
    "quantity",
    "intervals",
];

/// Upper bound (exclusive) for generated day identifiers.
const DAY_ID_UPPER: u32 = 100_000_000;

/// Quantity range for a single reading.
const QUANTITY_RANGE: Range<u32> = 100..500;

/// Number of interval buckets attached to each reading.
const INTERVAL_BUCKETS: u8 = 10;

/// Flow direction of a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Import,
    Export,
}

impl Direction {
    /// Both directions in the order they are written for each day.
    pub const BOTH: [Direction; 2] = [Direction::Import, Direction::Export];

    /// Single-letter code stored in the `direction` column.
    pub fn code(self) -> &'static str {
        match self {
            Direction::Import => "I",
            Direction::Export => "E",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Pair of day-level identifiers, rendered as a Postgres array literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayIdSet([u32; 2]);

impl DayIdSet {
    pub fn new(first: u32, second: u32) -> Self {
        Self([first, second])
    }

    /// Draw two identifiers from `0..100_000_000`.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self([
            rng.random_range(0..DAY_ID_UPPER),
            rng.random_range(0..DAY_ID_UPPER),
        ])
    }

    pub fn ids(&self) -> [u32; 2] {
        self.0
    }
}

impl fmt::Display for DayIdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{},{}}}", self.0[0], self.0[1])
    }
}

/// Interval buckets `0..n`, rendered as a Postgres array literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalSet {
    buckets: u8,
}

impl IntervalSet {
    pub fn new(buckets: u8) -> Self {
        Self { buckets }
    }

    pub fn buckets(&self) -> u8 {
        self.buckets
    }
}

impl Default for IntervalSet {
    fn default() -> Self {
        Self::new(INTERVAL_BUCKETS)
    }
}

impl fmt::Display for IntervalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for bucket in 0..self.buckets {
            if bucket > 0 {
                f.write_str(",")?;
            }
            write!(f, "{bucket}")?;
        }
        f.write_str("}")
    }
}

/// A single synthetic meter reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingRecord {
    pub nmi: u64,
    pub interval_date: NaiveDate,
    pub direction: Direction,
    pub nmi_day_ids: DayIdSet,
    pub quantity: u32,
    pub intervals: IntervalSet,
}

impl ReadingRecord {
    /// Render the record as text fields in [`COLUMNS`] order.
    pub fn to_fields(&self) -> [String; 6] {
        [
            self.nmi.to_string(),
            self.interval_date.format("%Y-%m-%d").to_string(),
            self.direction.code().to_string(),
            self.nmi_day_ids.to_string(),
            self.quantity.to_string(),
            self.intervals.to_string(),
        ]
    }
}

/// Consecutive days starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    start: NaiveDate,
    days: u32,
}

impl DateSpan {
    pub fn new(start: NaiveDate, days: u32) -> Self {
        Self { start, days }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    /// The `offset`-th day of the span, if it exists.
    pub fn date_at(&self, offset: u32) -> Option<NaiveDate> {
        if offset >= self.days {
            return None;
        }
        self.start.checked_add_days(Days::new(u64::from(offset)))
    }

    /// Last day of the span; `None` for an empty span or one that runs past
    /// the representable calendar.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.date_at(self.days.checked_sub(1)?)
    }
}

/// One unit of generation work: a file index and the meters it covers.
///
/// File `i` with `n` meters per file covers the closed range
/// `[i * n + 1, (i + 1) * n]`, so consecutive files tile the id space
/// without gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileAssignment {
    pub file_index: u64,
    pub nmi_per_file: u64,
}

impl FileAssignment {
    pub fn new(file_index: u64, nmi_per_file: u64) -> Self {
        Self {
            file_index,
            nmi_per_file,
        }
    }

    /// Meter ids covered by this file. Empty when `nmi_per_file` is zero.
    pub fn nmi_range(&self) -> RangeInclusive<u64> {
        let first = self.file_index * self.nmi_per_file + 1;
        let last = (self.file_index + 1) * self.nmi_per_file;
        first..=last
    }

    /// Number of records this file holds for the given span.
    pub fn record_count(&self, span: &DateSpan) -> u64 {
        self.nmi_per_file * u64::from(span.days()) * Direction::BOTH.len() as u64
    }

    pub fn csv_file_name(&self) -> String {
        format!("readings_{}.csv", self.file_index)
    }

    pub fn gzip_file_name(&self) -> String {
        format!("readings_{}.csv.gz", self.file_index)
    }

    /// Per-file seed derived from the run seed.
    pub fn seed(&self, base: u64) -> u64 {
        base.wrapping_add(self.file_index)
    }
}

/// Synthesizes the records of one file.
///
/// The day identifiers are drawn once per file; quantities are drawn per
/// record. The same assignment, span and seed always yield the same records.
pub struct RecordGenerator {
    rng: StdRng,
    assignment: FileAssignment,
    span: DateSpan,
    day_ids: DayIdSet,
    intervals: IntervalSet,
}

impl RecordGenerator {
    pub fn new(assignment: FileAssignment, span: DateSpan, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let day_ids = DayIdSet::random(&mut rng);
        Self {
            rng,
            assignment,
            span,
            day_ids,
            intervals: IntervalSet::default(),
        }
    }

    pub fn assignment(&self) -> FileAssignment {
        self.assignment
    }

    pub fn span(&self) -> DateSpan {
        self.span
    }

    pub fn day_ids(&self) -> DayIdSet {
        self.day_ids
    }

    /// Iterate over every record of the file, meter by meter, in date order
    /// with Import before Export.
    pub fn records(&mut self) -> Records<'_> {
        let range = self.assignment.nmi_range();
        Records {
            next_nmi: *range.start(),
            last_nmi: *range.end(),
            day: 0,
            direction: 0,
            generator: self,
        }
    }
}

/// Iterator returned by [`RecordGenerator::records`].
pub struct Records<'a> {
    generator: &'a mut RecordGenerator,
    next_nmi: u64,
    last_nmi: u64,
    day: u32,
    direction: usize,
}

impl Iterator for Records<'_> {
    type Item = ReadingRecord;

    fn next(&mut self) -> Option<ReadingRecord> {
        loop {
            if self.next_nmi > self.last_nmi {
                return None;
            }
            let Some(interval_date) = self.generator.span.date_at(self.day) else {
                self.day = 0;
                self.next_nmi += 1;
                continue;
            };

            let direction = Direction::BOTH[self.direction];
            self.direction += 1;
            if self.direction == Direction::BOTH.len() {
                self.direction = 0;
                self.day += 1;
            }

            return Some(ReadingRecord {
                nmi: self.next_nmi,
                interval_date,
                direction,
                nmi_day_ids: self.generator.day_ids,
                quantity: self.generator.rng.random_range(QUANTITY_RANGE),
                intervals: self.generator.intervals,
            });
        }
    }
}
