//! readings-bench library
//!
//! Two independent utilities for exercising a PostgreSQL readings table:
//!
//! - `generate`: synthesizes meter reading files, gzips them, stages them in
//!   S3 and bulk-imports each one through the `aws_s3` extension.
//! - `load-test`: runs randomized range reads over a shared connection pool
//!   and reports latency statistics.
//!
//! # CLI Usage
//!
//! ```bash
//! # Generate 16 files of 1000 meters each with 8 workers
//! readings-bench generate --file-count 16 --nmi-per-file 1000 --worker-threads 8 \
//!   --bucket my-bucket --db-host writer.example.com --db-user app --db-database meters
//!
//! # Generate locally without uploading or importing
//! readings-bench generate --file-count 2 --nmi-per-file 10 --worker-threads 2 --local-only
//!
//! # 32 concurrent range reads against a read replica
//! readings-bench load-test --db-readonly-host reader.example.com --load-threads 32 \
//!   --db-user app --db-database meters
//! ```
//!
//! Every option can also be supplied through the environment variable named
//! in its help text.

use clap::Args;

pub mod config;
pub mod connect;
pub mod generate;
pub mod loadtest;

/// Database credentials shared by both commands.
#[derive(Args, Clone, Debug)]
pub struct DbCredentials {
    /// Database user
    #[arg(long, env = "DB_USER", default_value = "postgres")]
    pub db_user: String,

    /// Database password
    #[arg(long, env = "DB_PASSWORD", default_value = "", hide_env_values = true)]
    pub db_password: String,

    /// Database port
    #[arg(long, env = "DB_PORT", default_value = "5432")]
    pub db_port: u16,

    /// Database name
    #[arg(long, env = "DB_DATABASE", default_value = "postgres")]
    pub db_database: String,
}
