//! S3 upload and delete operations

use crate::ObjectLocation;
use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::primitives::ByteStream;
use std::path::Path;
use std::time::Instant;

/// Shared S3 client
///
/// Creating an S3 client is relatively expensive, so one client is built per
/// run and shared by every worker.
#[derive(Clone)]
pub struct S3Client {
    client: aws_sdk_s3::Client,
}

impl S3Client {
    /// Create a new S3 client from the default AWS config chain
    pub async fn new() -> Result<Self> {
        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let client = aws_sdk_s3::Client::new(&sdk_config);
        Ok(Self { client })
    }

    /// Upload a local file, optionally tagging it with a `Content-Encoding`
    ///
    /// Returns the number of bytes uploaded.
    pub async fn upload_file(
        &self,
        location: &ObjectLocation,
        path: &Path,
        content_encoding: Option<&str>,
    ) -> Result<u64> {
        let start = Instant::now();
        let size = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Failed to stat upload source: {}", path.display()))?
            .len();

        let body = ByteStream::from_path(path)
            .await
            .with_context(|| format!("Failed to open upload source: {}", path.display()))?;

        let mut request = self
            .client
            .put_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .body(body);

        if let Some(encoding) = content_encoding {
            request = request.content_encoding(encoding);
        }

        request
            .send()
            .await
            .with_context(|| format!("Failed to upload {} to {location}", path.display()))?;

        tracing::debug!(
            "Uploaded {} bytes to {} in {:?}",
            size,
            location,
            start.elapsed()
        );

        Ok(size)
    }

    /// Delete an object
    pub async fn delete_object(&self, location: &ObjectLocation) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .with_context(|| format!("Failed to delete S3 object: {location}"))?;

        tracing::debug!("Deleted S3 object: {}", location);
        Ok(())
    }
}

// Upload and delete need AWS credentials and a bucket; they are exercised by
// the ignored end-to-end test in the workspace `tests/` directory.
