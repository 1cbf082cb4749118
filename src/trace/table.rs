//! Trace tables
//!
//! A trace table is the sorted, de-noised view of one command log. Every row
//! carries the gap to its predecessor, so the first parsed record never shows
//! up as a row: it only anchors the first gap.

use serde::Serialize;
use std::collections::HashMap;

/// One retained command invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRecord {
    /// Seconds, rounded to 5 decimal places
    pub timestamp: f64,
    /// Upper-cased command name
    pub command: String,
    /// Key the command was issued against (never empty)
    pub target: String,
}

/// A record together with its inter-arrival gap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRow {
    pub timestamp: f64,
    pub command: String,
    pub target: String,
    /// `1000 * (timestamp - previous timestamp)`
    pub inter_arrival_ms: f64,
}

/// Immutable, timestamp-ordered trace.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TraceTable {
    rows: Vec<TraceRow>,
}

impl TraceTable {
    /// Build a table from raw records: sort by timestamp, derive gaps and drop
    /// the first record.
    pub fn from_records(mut records: Vec<TraceRecord>) -> Self {
        records.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        let rows = records
            .windows(2)
            .map(|pair| TraceRow {
                timestamp: pair[1].timestamp,
                command: pair[1].command.clone(),
                target: pair[1].target.clone(),
                inter_arrival_ms: (pair[1].timestamp - pair[0].timestamp) * 1000.0,
            })
            .collect();

        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[TraceRow] {
        &self.rows
    }

    /// How often each command appears, most frequent first.
    pub fn command_counts(&self) -> Vec<(String, u64)> {
        value_counts(self.rows.iter().map(|r| r.command.as_str()))
    }

    /// How often each target key is accessed, most popular first.
    pub fn target_counts(&self) -> Vec<(String, u64)> {
        value_counts(self.rows.iter().map(|r| r.target.as_str()))
    }

    /// Inter-arrival gaps strictly greater than zero, in row order.
    pub fn positive_inter_arrivals_ms(&self) -> Vec<f64> {
        self.rows
            .iter()
            .map(|r| r.inter_arrival_ms)
            .filter(|&ms| ms > 0.0)
            .collect()
    }

    pub fn start_time(&self) -> Option<f64> {
        self.rows.first().map(|r| r.timestamp)
    }

    pub fn end_time(&self) -> Option<f64> {
        self.rows.last().map(|r| r.timestamp)
    }

    /// Seconds between the first and last row (0 for empty tables).
    pub fn duration_secs(&self) -> f64 {
        match (self.start_time(), self.end_time()) {
            (Some(start), Some(end)) => end - start,
            _ => 0.0,
        }
    }
}

/// Count occurrences, ordered by descending count then ascending key.
pub fn value_counts<'a>(values: impl Iterator<Item = &'a str>) -> Vec<(String, u64)> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }

    let mut counts: Vec<(String, u64)> = counts
        .into_iter()
        .map(|(key, count)| (key.to_string(), count))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ts: f64, command: &str, target: &str) -> TraceRecord {
        TraceRecord {
            timestamp: ts,
            command: command.to_string(),
            target: target.to_string(),
        }
    }

    #[test]
    fn test_first_record_is_dropped() {
        let table = TraceTable::from_records(vec![
            record(10.0, "GET", "a"),
            record(10.5, "SET", "b"),
            record(11.0, "GET", "a"),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].command, "SET");
        assert!((table.rows()[0].inter_arrival_ms - 500.0).abs() < 1e-6);
    }

    #[test]
    fn test_unsorted_input_gives_non_negative_gaps() {
        let table = TraceTable::from_records(vec![
            record(12.0, "GET", "a"),
            record(10.0, "GET", "b"),
            record(11.0, "GET", "c"),
            record(11.0, "DEL", "d"),
        ]);
        assert_eq!(table.len(), 3);
        assert!(table.rows().iter().all(|r| r.inter_arrival_ms >= 0.0));
        assert_eq!(table.start_time(), Some(11.0));
        assert_eq!(table.end_time(), Some(12.0));
    }

    #[test]
    fn test_single_record_gives_empty_table() {
        let table = TraceTable::from_records(vec![record(1.0, "GET", "a")]);
        assert!(table.is_empty());
        assert_eq!(table.duration_secs(), 0.0);
    }

    #[test]
    fn test_value_counts_order() {
        let counts = value_counts(["b", "a", "c", "a", "b", "a"].into_iter());
        assert_eq!(
            counts,
            vec![
                ("a".to_string(), 3),
                ("b".to_string(), 2),
                ("c".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_positive_inter_arrivals_skip_zero_gaps() {
        let table = TraceTable::from_records(vec![
            record(1.0, "GET", "a"),
            record(1.0, "GET", "a"),
            record(1.002, "GET", "a"),
        ]);
        let gaps = table.positive_inter_arrivals_ms();
        assert_eq!(gaps.len(), 1);
        assert!((gaps[0] - 2.0).abs() < 1e-6);
    }
}
