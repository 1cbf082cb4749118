//! Text reports
//!
//! Command-count comparison tables and the final statistical validation summary.
//! Everything renders to `String`; the driver decides where it goes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::metrics::{SimilarityMetrics, METRIC_COLUMNS};
use crate::trace::TraceTable;

const TOTAL_LABEL: &str = "TOTAL";

/// Legend printed under the summary table
const INTERPRETATION: &str = "\
Interpretation:
  P (p-value):      Significance. P < 0.05 means 'statistically different' (expected for large N).
  V (Cramer's V):   Effect size (categorical/binned). V < 0.1 indicates an 'excellent fit' (good).
  Alpha (Keys):     Power-law (Zipfian) exponent. Close values (e.g. 1.51 vs 1.53) show
                    that the shape of the distribution (the hotspot) was reproduced (good).";

/// Command counts and shares for one or two traces.
///
/// With no generated trace only the reference columns are shown.
pub fn command_counts_table(
    initial: Option<&TraceTable>,
    generated: Option<&TraceTable>,
    experiment_name: &str,
) -> String {
    let mut out = format!("\n--- Command Count Table: {} ---\n", experiment_name);

    let Some(initial) = initial else {
        out.push_str("'Initial' trace is empty.\n");
        return out;
    };

    let initial_counts = initial.command_counts();
    let initial_total: u64 = initial_counts.iter().map(|(_, c)| c).sum();

    let mut headers = vec![
        String::new(),
        "Initial (Count)".to_string(),
        "Initial (%)".to_string(),
    ];

    let rows: Vec<Vec<String>> = match generated {
        None => {
            out.push_str("'Generated' trace is empty or missing for this experiment.\n");
            let mut rows: Vec<Vec<String>> = initial_counts
                .iter()
                .map(|(cmd, c)| {
                    vec![
                        cmd.clone(),
                        fmt_thousands(*c),
                        fmt_percent(*c, initial_total),
                    ]
                })
                .collect();
            rows.push(vec![
                TOTAL_LABEL.to_string(),
                fmt_thousands(initial_total),
                "100.00".to_string(),
            ]);
            rows
        }
        Some(generated) => {
            headers.push("Generated (Count)".to_string());
            headers.push("Generated (%)".to_string());

            let generated_counts = generated.command_counts();
            let generated_total: u64 = generated_counts.iter().map(|(_, c)| c).sum();
            let lookup = |counts: &[(String, u64)], cmd: &str| {
                counts
                    .iter()
                    .find(|(k, _)| k == cmd)
                    .map_or(0, |(_, c)| *c)
            };

            let mut rows: Vec<Vec<String>> = aligned_commands(&initial_counts, &generated_counts)
                .into_iter()
                .map(|cmd| {
                    let i = lookup(&initial_counts, &cmd);
                    let g = lookup(&generated_counts, &cmd);
                    vec![
                        cmd,
                        fmt_thousands(i),
                        fmt_percent(i, initial_total),
                        fmt_thousands(g),
                        fmt_percent(g, generated_total),
                    ]
                })
                .collect();
            rows.push(vec![
                TOTAL_LABEL.to_string(),
                fmt_thousands(initial_total),
                "100.00".to_string(),
                fmt_thousands(generated_total),
                "100.00".to_string(),
            ]);
            rows
        }
    };

    out.push_str(&render_table(&headers, &rows));
    out.push_str(&"-".repeat(experiment_name.chars().count() + 34));
    out.push('\n');
    out
}

/// Row order for a comparison table. When both traces rank the same commands
/// in the same order that ranking is kept; otherwise the union is listed
/// alphabetically.
fn aligned_commands(initial: &[(String, u64)], generated: &[(String, u64)]) -> Vec<String> {
    let same_ranking = initial.len() == generated.len()
        && initial.iter().zip(generated).all(|((a, _), (b, _))| a == b);
    if same_ranking {
        return initial.iter().map(|(cmd, _)| cmd.clone()).collect();
    }

    initial
        .iter()
        .chain(generated)
        .map(|(cmd, _)| cmd.clone())
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

/// End-of-run statistical validation summary.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub generated_at: DateTime<Utc>,
    pub results: Vec<SimilarityMetrics>,
}

impl SummaryReport {
    pub fn new(results: Vec<SimilarityMetrics>) -> Self {
        Self {
            generated_at: Utc::now(),
            results,
        }
    }

    /// Summary table plus interpretation legend.
    pub fn render(&self) -> String {
        let mut out =
            String::from("\n\n=== Statistical Validation Table (Initial vs. Generated) ===\n");
        out.push_str(&format!("Generated at: {}\n", self.generated_at.to_rfc3339()));

        let mut headers = vec!["Experiment".to_string()];
        headers.extend(METRIC_COLUMNS.iter().map(|c| c.to_string()));

        let rows: Vec<Vec<String>> = self
            .results
            .iter()
            .map(|m| {
                let mut row = vec![m.experiment.clone()];
                row.extend(m.values().iter().map(|&v| fmt_metric(v)));
                row
            })
            .collect();

        out.push_str(&render_table(&headers, &rows));
        out.push('\n');
        out.push_str(INTERPRETATION);
        out.push('\n');
        out
    }

    /// Export as JSON (NaN becomes `null`)
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Left-align the first column, right-align the rest, two spaces apart.
fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let widths: Vec<usize> = (0..headers.len())
        .map(|col| {
            rows.iter()
                .filter_map(|r| r.get(col))
                .chain(std::iter::once(&headers[col]))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_row = |cells: &[String]| {
        let line = cells
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(col, (cell, &w))| {
                if col == 0 {
                    format!("{:<w$}", cell, w = w)
                } else {
                    format!("{:>w$}", cell, w = w)
                }
            })
            .collect::<Vec<_>>()
            .join("  ");
        format!("{}\n", line.trim_end())
    };

    let mut out = format_row(headers);
    for row in rows {
        out.push_str(&format_row(row.as_slice()));
    }
    out
}

fn fmt_percent(count: u64, total: u64) -> String {
    if total == 0 {
        return "0.00".to_string();
    }
    format!("{:.2}", count as f64 / total as f64 * 100.0)
}

fn fmt_metric(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{:.4}", value)
    }
}

/// `1234567` -> `"1,234,567"`
pub fn fmt_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::TraceRecord;

    fn trace(commands: &[&str]) -> TraceTable {
        TraceTable::from_records(
            commands
                .iter()
                .enumerate()
                .map(|(i, cmd)| TraceRecord {
                    timestamp: i as f64,
                    command: cmd.to_string(),
                    target: "k".to_string(),
                })
                .collect(),
        )
    }

    #[test]
    fn test_fmt_thousands() {
        assert_eq!(fmt_thousands(0), "0");
        assert_eq!(fmt_thousands(999), "999");
        assert_eq!(fmt_thousands(1_000), "1,000");
        assert_eq!(fmt_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn test_reference_only_table() {
        // first record is dropped: GET x2, SET x2
        let initial = trace(&["DEL", "GET", "SET", "GET", "SET"]);
        let out = command_counts_table(Some(&initial), None, "Base");
        assert!(out.contains("--- Command Count Table: Base ---"));
        assert!(out.contains("missing for this experiment"));
        assert!(!out.contains("Generated (Count)"));
        let total = out.lines().find(|l| l.starts_with("TOTAL")).unwrap();
        assert!(total.contains('4'));
        assert!(total.ends_with("100.00"));
        assert!(out.contains(&"-".repeat(4 + 34)));
    }

    #[test]
    fn test_comparison_table_includes_generated_only_commands() {
        let initial = trace(&["GET", "GET", "GET", "SET"]);
        let generated = trace(&["GET", "GET", "DEL", "DEL", "DEL"]);
        let out = command_counts_table(Some(&initial), Some(&generated), "Exp");
        let get = out.lines().find(|l| l.starts_with("GET")).unwrap();
        assert!(get.contains("66.67"));
        assert!(get.contains("25.00"));
        let del = out.lines().find(|l| l.starts_with("DEL")).unwrap();
        assert!(del.contains("0.00"));
        assert!(del.contains("75.00"));
    }

    #[test]
    fn test_comparison_rows_sorted_when_rankings_differ() {
        let initial = trace(&["X", "SET", "SET", "GET", "GET", "GET"]);
        let generated = trace(&["X", "GET", "ZADD", "ZADD", "ZADD"]);
        let out = command_counts_table(Some(&initial), Some(&generated), "Exp");
        let order: Vec<&str> = out
            .lines()
            .filter_map(|l| l.split_whitespace().next())
            .filter(|w| ["GET", "SET", "ZADD"].contains(w))
            .collect();
        assert_eq!(order, vec!["GET", "SET", "ZADD"]);
    }

    #[test]
    fn test_comparison_rows_keep_shared_ranking() {
        let initial = trace(&["X", "SET", "GET", "GET", "GET"]);
        let out = command_counts_table(Some(&initial), Some(&initial), "Base");
        let order: Vec<&str> = out
            .lines()
            .filter_map(|l| l.split_whitespace().next())
            .filter(|w| ["GET", "SET"].contains(w))
            .collect();
        assert_eq!(order, vec!["GET", "SET"]);
    }

    #[test]
    fn test_missing_reference_table() {
        let out = command_counts_table(None, None, "Exp");
        assert!(out.contains("'Initial' trace is empty."));
    }

    #[test]
    fn test_summary_render_and_json() {
        let mut m = SimilarityMetrics::undefined("Simple Replay");
        m.command_p_value = 0.123456;
        let report = SummaryReport::new(vec![m]);
        let out = report.render();
        assert!(out.contains("Simple Replay"));
        assert!(out.contains("0.1235"));
        assert!(out.contains("NaN"));
        assert!(out.contains("Interpretation:"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["results"][0]["experiment"], "Simple Replay");
        assert!(json["results"][0]["alpha_initial"].is_null());
    }
}
