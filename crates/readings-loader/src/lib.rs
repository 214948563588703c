//! Bulk import of staged reading files into PostgreSQL.
//!
//! Each import runs on its own connection, inside one transaction with
//! `synchronous_commit` disabled, and calls the `aws_s3` extension to pull
//! the object straight from the bucket.
//!
//! # Example
//!
//! ```ignore
//! use readings_loader::{BulkLoader, ImportTarget};
//!
//! let target = ImportTarget::new("readings", columns, '|', "ap-southeast-2");
//! let loader = BulkLoader::new("host=db user=app password=... dbname=meters", target);
//! let summary = loader.import_object("my-bucket", "readings_0.csv.gz").await?;
//! ```

mod error;
mod import;

pub use error::LoaderError;
pub use import::{BulkLoader, ImportSummary, ImportTarget, DEFAULT_REGION, DEFAULT_TABLE};
