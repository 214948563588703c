//! Object storage access for generated reading files.
//!
//! Uploads compressed files to S3 with a content-encoding hint and removes
//! them again once the database has imported them.
//!
//! # Example
//!
//! ```ignore
//! use readings_storage::{ObjectLocation, S3Client};
//!
//! let client = S3Client::new().await?;
//! let location = ObjectLocation::new("my-bucket", "readings_0.csv.gz");
//! client.upload_file(&location, "output/readings_0.csv.gz".as_ref(), Some("gzip")).await?;
//! client.delete_object(&location).await?;
//! ```

mod s3;

pub use s3::S3Client;

use std::fmt;

/// Bucket and key of one object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_location_display() {
        let location = ObjectLocation::new("meter-data", "readings_3.csv.gz");
        assert_eq!(location.to_string(), "s3://meter-data/readings_3.csv.gz");
    }

    #[test]
    fn test_object_location_equality() {
        let a = ObjectLocation::new("bucket", "key");
        let b = ObjectLocation::new("bucket".to_string(), "key".to_string());
        assert_eq!(a, b);
    }
}
