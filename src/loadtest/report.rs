//! Result file and summary output.

use anyhow::Context;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use query_bench::{HarnessOutcome, LatencyStats};
use std::fs::OpenOptions;
use std::path::Path;

/// Append one `threads,max,min,mean,median,stdev` line to `path`, creating
/// the file and its parent directories if needed.
pub fn append_result(path: &Path, threads: usize, stats: &LatencyStats) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open result file {}", path.display()))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer
        .write_record(stats.csv_fields(threads))
        .with_context(|| format!("Failed to write result to {}", path.display()))?;
    writer.flush()?;

    Ok(())
}

/// Human-readable summary of a load test run. Latencies are in seconds.
pub fn format_summary(threads: usize, stats: &LatencyStats, outcome: &HarnessOutcome) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Metric", "Value"]);

    let rows = [
        ("Threads", threads.to_string()),
        ("Queries", stats.count.to_string()),
        ("Rows fetched", outcome.rows_fetched.to_string()),
        ("Max", format_seconds(stats.max)),
        ("Min", format_seconds(stats.min)),
        ("Mean", format_seconds(stats.mean)),
        ("Median", format_seconds(stats.median)),
        ("Std Dev", format_seconds(stats.stdev)),
        ("Queries/sec", format!("{:.1}", outcome.queries_per_second())),
    ];
    for (metric, value) in rows {
        table.add_row(vec![Cell::new(metric), Cell::new(value)]);
    }

    let failures = outcome.failures.len();
    let failure_cell = if failures == 0 {
        Cell::new("0").fg(Color::Green)
    } else {
        Cell::new(failures).fg(Color::Red)
    };
    table.add_row(vec![Cell::new("Failures"), failure_cell]);

    format!("Load test results\n{table}")
}

fn format_seconds(value: f64) -> String {
    format!("{value:.4}s")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn stats() -> LatencyStats {
        LatencyStats::from_samples(&[0.1, 0.2, 0.3, 0.4]).unwrap()
    }

    #[test]
    fn test_append_result_creates_parents_and_appends() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/out/load_test_result.csv");

        append_result(&path, 8, &stats()).unwrap();
        append_result(&path, 16, &stats()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "8,0.4000,0.1000,0.2500,0.2500,0.1291");
        assert!(lines[1].starts_with("16,"));
        for line in lines {
            assert_eq!(line.split(',').count(), 6);
        }
    }

    #[test]
    fn test_append_result_in_current_directory_name() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("result.csv");
        append_result(&path, 1, &stats()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_format_summary() {
        let outcome = HarnessOutcome {
            samples: vec![0.1, 0.2, 0.3, 0.4],
            rows_fetched: 1_200,
            failures: vec!["Query 3 failed: boom".to_string()],
            wall_clock: Duration::from_secs(2),
        };

        let summary = format_summary(4, &stats(), &outcome);

        assert!(summary.starts_with("Load test results"));
        assert!(summary.contains("Std Dev"));
        assert!(summary.contains("0.4000s"));
        assert!(summary.contains("1200"));
        assert!(summary.contains("Failures"));
        // 4 samples over 2 seconds.
        assert!(summary.contains("2.0"));
    }
}
