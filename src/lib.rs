//! Trace Similarity
//!
//! Compares Redis MONITOR-style command traces produced by a traffic generator
//! against a reference trace: command mix, inter-arrival timing and key
//! popularity skew.

pub mod config;
pub mod driver;
pub mod metrics;
pub mod plot;
pub mod report;
pub mod stats;
pub mod trace;

pub use config::AnalysisConfig;
pub use driver::run;
pub use metrics::{calculate_similarity_metrics, SimilarityMetrics};
