//! Log-spaced histograms for inter-arrival times
//!
//! Gaps between commands span many orders of magnitude (sub-millisecond bursts
//! next to multi-second pauses), so buckets are spaced evenly in log10 space.
//! Bucketing matches numpy: `[e_i, e_{i+1})` with the last bucket closed.

/// Number of bucket edges (one more than the number of buckets)
pub const LOG_BIN_EDGES: usize = 50;

/// Fallback range, in log10(ms), for empty or degenerate data
pub const DEFAULT_MIN_LOG: f64 = -6.0;
pub const DEFAULT_MAX_LOG: f64 = 5.0;

/// Replacement for a non-positive lower bound (ms)
pub const MIN_POSITIVE_MS: f64 = 1e-6;

/// Log-spaced bucket edges.
#[derive(Debug, Clone, PartialEq)]
pub struct LogBins {
    edges: Vec<f64>,
}

impl Default for LogBins {
    fn default() -> Self {
        Self::logspace(DEFAULT_MIN_LOG, DEFAULT_MAX_LOG, LOG_BIN_EDGES)
    }
}

impl LogBins {
    /// `num` edges at `10^linspace(min_log, max_log, num)`.
    pub fn logspace(min_log: f64, max_log: f64, num: usize) -> Self {
        let edges = match num {
            0 => Vec::new(),
            1 => vec![10f64.powf(min_log)],
            _ => {
                let step = (max_log - min_log) / (num - 1) as f64;
                (0..num)
                    .map(|i| {
                        let exp = if i == num - 1 {
                            max_log
                        } else {
                            min_log + i as f64 * step
                        };
                        10f64.powf(exp)
                    })
                    .collect()
            }
        };
        Self { edges }
    }

    /// Edges spanning the min/max of `values`, falling back to the default
    /// range when the span is empty, degenerate or not finite.
    pub fn spanning<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let (min, max) = values
            .into_iter()
            .filter(|v| !v.is_nan())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });

        if min > max {
            return Self::default();
        }

        let min = if min <= 0.0 { MIN_POSITIVE_MS } else { min };
        let (min_log, max_log) = (min.log10(), max.log10());

        if min_log.is_finite() && max_log.is_finite() && max_log > min_log {
            Self::logspace(min_log, max_log, LOG_BIN_EDGES)
        } else {
            Self::default()
        }
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn bucket_count(&self) -> usize {
        self.edges.len().saturating_sub(1)
    }

    /// Bucket holding `value`, if it falls inside the edges.
    pub fn bucket_index(&self, value: f64) -> Option<usize> {
        let n = self.bucket_count();
        if n == 0 || value.is_nan() {
            return None;
        }
        let (first, last) = (self.edges[0], self.edges[n]);
        if value < first || value > last {
            return None;
        }
        if value == last {
            return Some(n - 1);
        }
        let upper = self.edges.partition_point(|&e| e <= value);
        Some(upper - 1)
    }

    /// Count `values` per bucket; out-of-range values are ignored.
    pub fn counts(&self, values: &[f64]) -> Vec<u64> {
        let mut counts = vec![0u64; self.bucket_count()];
        for &value in values {
            if let Some(idx) = self.bucket_index(value) {
                counts[idx] += 1;
            }
        }
        counts
    }

    /// Probability density per bucket: `count / (total * width)`.
    pub fn density(&self, values: &[f64]) -> Vec<f64> {
        let counts = self.counts(values);
        let total: u64 = counts.iter().sum();
        if total == 0 {
            return vec![0.0; counts.len()];
        }
        counts
            .iter()
            .zip(self.edges.windows(2))
            .map(|(&c, w)| c as f64 / (total as f64 * (w[1] - w[0])))
            .collect()
    }
}
