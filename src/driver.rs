//! Experiment driver
//!
//! Loads the reference trace once, then walks the configured experiments:
//! command table, similarity metrics, comparison figure. The summary table is
//! printed at the end.

use anyhow::{bail, Result};
use tracing::{error, info, warn};

use crate::config::{AnalysisConfig, ExperimentConfig};
use crate::metrics::{calculate_similarity_metrics, SimilarityMetrics};
use crate::plot::{render_comparison, TraceRole};
use crate::report::{command_counts_table, SummaryReport};
use crate::trace::{parse_trace_file, TraceTable};

const BASE_TABLE_NAME: &str = "Initial Log (Base)";

/// Run every configured experiment against the reference trace.
///
/// Fails only when the reference trace cannot be loaded; anything that goes
/// wrong inside an experiment is logged and shows up as NaN in its metrics.
pub fn run(config: &AnalysisConfig) -> Result<Vec<SimilarityMetrics>> {
    let Some(initial) = parse_trace_file(&config.reference_trace) else {
        error!(
            "Could not load reference trace {}; aborting analysis",
            config.reference_trace.display()
        );
        bail!(
            "reference trace {} is missing or has no usable records",
            config.reference_trace.display()
        );
    };

    println!("{}", command_counts_table(Some(&initial), Some(&initial), BASE_TABLE_NAME));

    let results: Vec<SimilarityMetrics> = config
        .experiments
        .iter()
        .map(|experiment| run_experiment(config, experiment, &initial))
        .collect();

    println!("{}", SummaryReport::new(results.clone()).render());
    Ok(results)
}

fn run_experiment(
    config: &AnalysisConfig,
    experiment: &ExperimentConfig,
    initial: &TraceTable,
) -> SimilarityMetrics {
    info!(
        "Processing experiment {}: {}",
        experiment.index, experiment.name
    );

    let generated = parse_trace_file(config.generated_trace_path(experiment));
    let received = parse_trace_file(config.received_trace_path(experiment));
    if generated.is_none() {
        warn!(
            "No generated trace for experiment {}; metrics will be undefined",
            experiment.name
        );
    }

    println!(
        "{}",
        command_counts_table(Some(initial), generated.as_ref(), &experiment.name)
    );

    let metrics = calculate_similarity_metrics(&experiment.name, Some(initial), generated.as_ref());

    if config.plot.enabled {
        let traces = [
            (TraceRole::Initial, Some(initial)),
            (TraceRole::Generated, generated.as_ref()),
            (TraceRole::Received, received.as_ref()),
        ];
        let path = config.plot_path(experiment);
        if let Err(e) = render_comparison(
            &traces,
            &experiment.name,
            &path,
            (config.plot.width, config.plot.height),
        ) {
            error!("Failed to render {}: {:#}", path.display(), e);
        }
    }

    metrics
}
