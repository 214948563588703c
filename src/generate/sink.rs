//! S3 staging plus `aws_s3` import.

use super::pipeline::ArtifactSink;
use super::GenerateArgs;
use crate::connect::{connection_string, mask_connection_password};
use anyhow::Context;
use async_trait::async_trait;
use readings_generator::{COLUMNS, DELIMITER};
use readings_loader::{BulkLoader, ImportSummary, ImportTarget};
use readings_storage::{ObjectLocation, S3Client};
use std::path::Path;

/// Stages files in a bucket and imports them with the writer database.
pub struct S3ImportSink {
    s3: S3Client,
    bucket: String,
    loader: BulkLoader,
}

impl S3ImportSink {
    /// Build the S3 client and check the database is reachable.
    pub async fn connect(args: &GenerateArgs) -> anyhow::Result<Self> {
        let bucket = args
            .bucket
            .clone()
            .context("--bucket (BUCKET_NAME) is required unless --local-only is set")?;
        let db_host = args
            .db_host
            .as_deref()
            .context("--db-host (DB_HOST) is required unless --local-only is set")?;

        let conn = connection_string(db_host, &args.db);
        tracing::info!("Connecting to {}", mask_connection_password(&conn));

        let target = ImportTarget::new(
            args.table.clone(),
            COLUMNS,
            char::from(DELIMITER),
            args.s3_region.clone(),
        );
        let loader = BulkLoader::new(conn, target);
        loader
            .check_connection()
            .await
            .context("Failed to connect to the writer database")?;

        let s3 = S3Client::new().await?;

        Ok(Self { s3, bucket, loader })
    }

    fn location(&self, object_name: &str) -> ObjectLocation {
        ObjectLocation::new(self.bucket.as_str(), object_name)
    }
}

#[async_trait]
impl ArtifactSink for S3ImportSink {
    async fn stage(&self, local_path: &Path, object_name: &str) -> anyhow::Result<()> {
        self.s3
            .upload_file(&self.location(object_name), local_path, Some("gzip"))
            .await?;
        Ok(())
    }

    async fn import(&self, object_name: &str) -> anyhow::Result<ImportSummary> {
        Ok(self.loader.import_object(&self.bucket, object_name).await?)
    }

    async fn discard(&self, object_name: &str) -> anyhow::Result<()> {
        self.s3.delete_object(&self.location(object_name)).await
    }
}
