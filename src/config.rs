//! Analysis configuration
//!
//! Experiment table and trace file layout. The defaults are the standard
//! layout, so running without a config file needs nothing on top of the logs:
//!
//! ```text
//! logs/input/trace.log
//! logs/output/<suffix>/synthetic_trace.log
//! logs/output/<suffix>/redis_monitor_received.log
//! logs/output/<suffix>/test<index>.png
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the config file path
pub const CONFIG_PATH_ENV: &str = "TRACE_SIMILARITY_CONFIG";

/// Top-level analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Reference ("initial") trace
    #[serde(default = "default_reference_trace")]
    pub reference_trace: PathBuf,

    /// Directory holding one sub-directory per experiment
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// File name of the generated trace inside an experiment directory
    #[serde(default = "default_generated_file_name")]
    pub generated_file_name: String,

    /// File name of the received (replayed) trace inside an experiment directory
    #[serde(default = "default_received_file_name")]
    pub received_file_name: String,

    /// Experiments, processed in order
    #[serde(default = "default_experiments")]
    pub experiments: Vec<ExperimentConfig>,

    #[serde(default)]
    pub plot: PlotConfig,
}

/// One experiment: a generated/received trace pair compared against the reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub index: u32,
    pub name: String,
    pub path_suffix: String,
}

impl ExperimentConfig {
    fn new(index: u32, name: &str, path_suffix: &str) -> Self {
        Self {
            index,
            name: name.to_string(),
            path_suffix: path_suffix.to_string(),
        }
    }
}

/// Figure rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Figure width in pixels
    #[serde(default = "default_plot_width")]
    pub width: u32,

    /// Figure height in pixels
    #[serde(default = "default_plot_height")]
    pub height: u32,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            width: default_plot_width(),
            height: default_plot_height(),
        }
    }
}

fn default_reference_trace() -> PathBuf {
    PathBuf::from("logs/input/trace.log")
}

fn default_output_root() -> PathBuf {
    PathBuf::from("logs/output")
}

fn default_generated_file_name() -> String {
    "synthetic_trace.log".to_string()
}

fn default_received_file_name() -> String {
    "redis_monitor_received.log".to_string()
}

fn default_experiments() -> Vec<ExperimentConfig> {
    vec![
        ExperimentConfig::new(1, "Simple Replay", "test1"),
        ExperimentConfig::new(2, "Heatmap 1% (Original)", "test2"),
        ExperimentConfig::new(3, "Heatmap 50% (Original)", "test3"),
        ExperimentConfig::new(4, "Heatmap 1% (Cyclic)", "test4"),
        ExperimentConfig::new(5, "Heatmap 1% (Stretch)", "test5"),
    ]
}

fn default_true() -> bool {
    true
}

fn default_plot_width() -> u32 {
    1600
}

fn default_plot_height() -> u32 {
    1200
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            reference_trace: default_reference_trace(),
            output_root: default_output_root(),
            generated_file_name: default_generated_file_name(),
            received_file_name: default_received_file_name(),
            experiments: default_experiments(),
            plot: PlotConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load from TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Load from the path in `TRACE_SIMILARITY_CONFIG`, or use defaults
    pub fn from_env() -> Self {
        let Ok(path) = std::env::var(CONFIG_PATH_ENV) else {
            return Self::default();
        };

        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Using default analysis config ({}): {:#}", path, e);
            Self::default()
        })
    }

    /// Resolve relative trace and output paths against `base`
    pub fn with_base_dir(mut self, base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        if self.reference_trace.is_relative() {
            self.reference_trace = base.join(&self.reference_trace);
        }
        if self.output_root.is_relative() {
            self.output_root = base.join(&self.output_root);
        }
        self
    }

    /// Directory holding an experiment's traces and figure
    pub fn output_dir(&self, experiment: &ExperimentConfig) -> PathBuf {
        self.output_root.join(&experiment.path_suffix)
    }

    pub fn generated_trace_path(&self, experiment: &ExperimentConfig) -> PathBuf {
        self.output_dir(experiment).join(&self.generated_file_name)
    }

    pub fn received_trace_path(&self, experiment: &ExperimentConfig) -> PathBuf {
        self.output_dir(experiment).join(&self.received_file_name)
    }

    /// `<output_dir>/test<index>.png`
    pub fn plot_path(&self, experiment: &ExperimentConfig) -> PathBuf {
        self.output_dir(experiment)
            .join(format!("test{}.png", experiment.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = AnalysisConfig::default();
        assert_eq!(config.experiments.len(), 5);
        let exp = &config.experiments[2];
        assert_eq!(exp.name, "Heatmap 50% (Original)");
        assert_eq!(
            config.generated_trace_path(exp),
            PathBuf::from("logs/output/test3/synthetic_trace.log")
        );
        assert_eq!(
            config.received_trace_path(exp),
            PathBuf::from("logs/output/test3/redis_monitor_received.log")
        );
        assert_eq!(config.plot_path(exp), PathBuf::from("logs/output/test3/test3.png"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AnalysisConfig = toml::from_str(
            r#"
            reference_trace = "ref.log"

            [[experiments]]
            index = 7
            name = "Custom"
            path_suffix = "custom"

            [plot]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.reference_trace, PathBuf::from("ref.log"));
        assert_eq!(config.output_root, PathBuf::from("logs/output"));
        assert_eq!(config.experiments.len(), 1);
        assert_eq!(config.experiments[0].index, 7);
        assert!(!config.plot.enabled);
        assert_eq!(config.plot.width, 1600);
    }

    #[test]
    fn test_with_base_dir_keeps_absolute_paths() {
        let mut config = AnalysisConfig::default();
        config.output_root = PathBuf::from("/abs/out");
        let config = config.with_base_dir("/data");
        assert_eq!(config.reference_trace, PathBuf::from("/data/logs/input/trace.log"));
        assert_eq!(config.output_root, PathBuf::from("/abs/out"));
    }

    #[test]
    fn test_load_missing_file_errors() {
        assert!(AnalysisConfig::load("/no/such/config.toml").is_err());
    }
}
