//! Command-line interface for readings-bench
//!
//! # Usage Examples
//!
//! ## Generate and load
//! ```bash
//! # 16 files of 1000 meters each, 8 files in flight
//! BUCKET_NAME=meter-staging DB_HOST=writer.example.com DB_PASSWORD=secret \
//! readings-bench generate --file-count 16 --nmi-per-file 1000 --worker-threads 8
//!
//! # Keep the compressed files locally instead of uploading them
//! readings-bench generate --file-count 2 --nmi-per-file 10 --worker-threads 2 \
//!   --local-only --output-dir ./output
//! ```
//!
//! ## Load test
//! ```bash
//! DB_READONLY_HOST=reader.example.com DB_PASSWORD=secret \
//! readings-bench load-test --load-threads 32 --query-count 1000
//! ```
//!
//! Set `RUST_LOG` (e.g. `RUST_LOG=debug`) to change the log level.

use clap::{Parser, Subcommand};
use readings_bench::generate::{run_generate, GenerateArgs};
use readings_bench::loadtest::{run_load_test, LoadTestArgs};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "readings-bench")]
#[command(about = "Synthetic meter reading loader and read-latency load tester for PostgreSQL")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate reading files, stage them in S3 and import them
    Generate {
        #[command(flatten)]
        args: GenerateArgs,
    },

    /// Run concurrent randomized range reads and report latencies
    #[command(name = "load-test")]
    LoadTest {
        #[command(flatten)]
        args: LoadTestArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { args } => run_generate(args).await,
        Commands::LoadTest { args } => run_load_test(args).await,
    }
}
