//! Similarity metrics between a reference trace and a generated one
//!
//! Three checks, one per aspect a traffic generator has to reproduce:
//! - command mix: chi-square over command counts
//! - timing: chi-square over log-spaced inter-arrival buckets
//! - popularity skew: power-law exponent of per-key access counts
//!
//! Every value may be NaN; nothing here fails.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, warn};

use crate::stats::{chi2_and_cramers_v, fit_discrete, ContingencyTable, LogBins};
use crate::trace::TraceTable;

/// Summary column headers, in display order
pub const METRIC_COLUMNS: [&str; 6] = [
    "P (Commands)",
    "V (Commands)",
    "P (Timing)",
    "V (Timing)",
    "Alpha (Initial)",
    "Alpha (Generated)",
];

/// Per-experiment similarity bundle. NaN means "not computable".
#[derive(Debug, Clone, Serialize)]
pub struct SimilarityMetrics {
    pub experiment: String,
    pub command_p_value: f64,
    pub command_cramers_v: f64,
    pub timing_p_value: f64,
    pub timing_cramers_v: f64,
    pub alpha_initial: f64,
    pub alpha_generated: f64,
}

impl SimilarityMetrics {
    pub fn undefined(experiment: impl Into<String>) -> Self {
        Self {
            experiment: experiment.into(),
            command_p_value: f64::NAN,
            command_cramers_v: f64::NAN,
            timing_p_value: f64::NAN,
            timing_cramers_v: f64::NAN,
            alpha_initial: f64::NAN,
            alpha_generated: f64::NAN,
        }
    }

    /// Values in [`METRIC_COLUMNS`] order.
    pub fn values(&self) -> [f64; 6] {
        [
            self.command_p_value,
            self.command_cramers_v,
            self.timing_p_value,
            self.timing_cramers_v,
            self.alpha_initial,
            self.alpha_generated,
        ]
    }
}

/// Compare `generated` against `initial`.
pub fn calculate_similarity_metrics(
    experiment: &str,
    initial: Option<&TraceTable>,
    generated: Option<&TraceTable>,
) -> SimilarityMetrics {
    let mut metrics = SimilarityMetrics::undefined(experiment);

    let (initial, generated) = match (initial, generated) {
        (Some(i), Some(g)) if !i.is_empty() && !g.is_empty() => (i, g),
        _ => {
            debug!(experiment, "skipping metrics: missing or empty trace");
            return metrics;
        }
    };

    let commands =
        ContingencyTable::from_count_maps(&initial.command_counts(), &generated.command_counts());
    (metrics.command_p_value, metrics.command_cramers_v) = chi2_and_cramers_v(&commands);

    match timing_similarity(initial, generated) {
        Ok(Some((p, v))) => {
            metrics.timing_p_value = p;
            metrics.timing_cramers_v = v;
        }
        Ok(None) => debug!(experiment, "no positive inter-arrival times to compare"),
        Err(e) => warn!("Timing chi-square test failed: {:#}", e),
    }

    metrics.alpha_initial = popularity_alpha(initial, "initial");
    metrics.alpha_generated = popularity_alpha(generated, "generated");

    metrics
}

/// Chi-square over shared log-spaced buckets. `None` when either side has
/// no strictly positive gap.
fn timing_similarity(initial: &TraceTable, generated: &TraceTable) -> Result<Option<(f64, f64)>> {
    let initial_gaps = initial.positive_inter_arrivals_ms();
    let generated_gaps = generated.positive_inter_arrivals_ms();
    if initial_gaps.is_empty() || generated_gaps.is_empty() {
        return Ok(None);
    }

    let bins = LogBins::spanning(initial_gaps.iter().chain(&generated_gaps).copied());
    let table =
        ContingencyTable::from_columns(&bins.counts(&initial_gaps), &bins.counts(&generated_gaps))?;
    Ok(Some(chi2_and_cramers_v(&table)))
}

/// Power-law exponent of per-key access counts, NaN when not computable.
fn popularity_alpha(table: &TraceTable, side: &str) -> f64 {
    let counts: Vec<u64> = table.target_counts().into_iter().map(|(_, c)| c).collect();
    if counts.len() <= 1 {
        return f64::NAN;
    }

    match fit_discrete(&counts) {
        Ok(fit) => {
            debug!(side, alpha = fit.alpha, xmin = fit.xmin, "power-law fit");
            fit.alpha
        }
        Err(e) => {
            warn!("Power-law fit failed for {} trace: {:#}", side, e);
            f64::NAN
        }
    }
}
