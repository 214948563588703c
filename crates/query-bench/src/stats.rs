//! Latency aggregation.

use crate::error::StatsError;

/// Summary of a set of latency samples, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (n - 1 denominator).
    pub stdev: f64,
}

impl LatencyStats {
    /// Summarize `samples`. At least two finite samples are required.
    pub fn from_samples(samples: &[f64]) -> Result<Self, StatsError> {
        if samples.len() < 2 {
            return Err(StatsError::InsufficientSamples(samples.len()));
        }
        if samples.iter().any(|sample| !sample.is_finite()) {
            return Err(StatsError::NonFiniteSample);
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let min = sorted[0];
        let max = sorted[count - 1];

        let middle = count / 2;
        let median = if count % 2 == 1 {
            sorted[middle]
        } else {
            (sorted[middle - 1] + sorted[middle]) / 2.0
        };

        // Rounding can push the mean a ulp past the extremes.
        let mean = (sorted.iter().sum::<f64>() / count as f64).clamp(min, max);

        let variance = sorted
            .iter()
            .map(|sample| (sample - mean).powi(2))
            .sum::<f64>()
            / (count - 1) as f64;

        Ok(Self {
            count,
            min,
            max,
            mean,
            median,
            stdev: variance.sqrt(),
        })
    }

    /// Result-file fields: `threads,max,min,mean,median,stdev`.
    pub fn csv_fields(&self, threads: usize) -> [String; 6] {
        [
            threads.to_string(),
            format!("{:.4}", self.max),
            format!("{:.4}", self.min),
            format!("{:.4}", self.mean),
            format!("{:.4}", self.median),
            format!("{:.4}", self.stdev),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_known_values() {
        let stats = LatencyStats::from_samples(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();

        assert_eq!(stats.count, 8);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
        assert!(approx_eq(stats.mean, 5.0));
        assert!(approx_eq(stats.median, 4.5));
        // Sample variance is 32 / 7.
        assert!(approx_eq(stats.stdev, (32.0f64 / 7.0).sqrt()));
    }

    #[test]
    fn test_odd_count_median() {
        let stats = LatencyStats::from_samples(&[0.3, 0.1, 0.2]).unwrap();
        assert_eq!(stats.median, 0.2);
        assert!(approx_eq(stats.stdev, 0.1));
    }

    #[test]
    fn test_identical_samples() {
        let stats = LatencyStats::from_samples(&[0.1, 0.1, 0.1]).unwrap();
        assert_eq!(stats.mean, 0.1);
        assert_eq!(stats.median, 0.1);
        assert!(stats.stdev < 1e-12);
    }

    #[test]
    fn test_insufficient_samples() {
        assert_eq!(
            LatencyStats::from_samples(&[]),
            Err(StatsError::InsufficientSamples(0))
        );
        assert_eq!(
            LatencyStats::from_samples(&[0.5]),
            Err(StatsError::InsufficientSamples(1))
        );
    }

    #[test]
    fn test_non_finite_samples() {
        assert_eq!(
            LatencyStats::from_samples(&[0.5, f64::NAN]),
            Err(StatsError::NonFiniteSample)
        );
        assert_eq!(
            LatencyStats::from_samples(&[0.5, f64::INFINITY]),
            Err(StatsError::NonFiniteSample)
        );
    }

    #[test]
    fn test_ordering_holds_for_random_sample_sets() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let len = rng.random_range(2..200);
            let samples: Vec<f64> = (0..len).map(|_| rng.random_range(0.0001..5.0)).collect();
            let stats = LatencyStats::from_samples(&samples).unwrap();

            assert!(stats.min <= stats.median && stats.median <= stats.max);
            assert!(stats.min <= stats.mean && stats.mean <= stats.max);
            assert!(stats.stdev >= 0.0);
            assert_eq!(stats.count, len);
        }
    }

    #[test]
    fn test_csv_fields() {
        let stats = LatencyStats::from_samples(&[0.012345, 0.5, 0.25]).unwrap();
        let fields = stats.csv_fields(16);

        assert_eq!(fields[0], "16");
        assert_eq!(fields[1], "0.5000");
        assert_eq!(fields[2], "0.0123");
        assert_eq!(fields[4], "0.2500");
        assert!(fields.iter().skip(1).all(|f| f.split('.').nth(1).map(str::len) == Some(4)));
    }
}
