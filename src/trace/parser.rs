//! Command log parsing
//!
//! Lines look like Redis `MONITOR` output:
//!
//! ```text
//! 1700000000.123456 [0 127.0.0.1:6379] "GET" "user:42" "extra" "args"
//! ```
//!
//! Only lines with a quoted target and a command other than `CLIENT` are kept.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::{debug, error, info, warn};

use super::table::{TraceRecord, TraceTable};

lazy_static! {
    static ref LOG_LINE: Regex = Regex::new(
        r#"^(?P<timestamp>[0-9]+\.[0-9]+)\s+\[(?P<db>[0-9]+)\s+(?P<client_ip>[^\]]+)\]\s+"(?P<command>\w+)"(?:\s+"(?P<target>[^"]*)")?(?P<other_args>.*)?$"#
    )
    .expect("log line pattern is valid");
}

/// Connection-management command that never targets a key.
const CONTROL_COMMAND: &str = "CLIENT";

/// Decimal places kept on timestamps.
const TIMESTAMP_DECIMALS: i32 = 5;

/// Parse a single log line.
///
/// Returns `Ok(None)` for lines that don't match, have no (or an empty) target,
/// or carry the `CLIENT` command.
pub fn parse_line(line: &str) -> Result<Option<TraceRecord>> {
    let Some(caps) = LOG_LINE.captures(line.trim()) else {
        return Ok(None);
    };

    let target = match caps.name("target") {
        Some(m) if !m.as_str().is_empty() => m.as_str(),
        _ => return Ok(None),
    };

    let command = caps["command"].to_uppercase();
    if command == CONTROL_COMMAND {
        return Ok(None);
    }

    let raw_ts = &caps["timestamp"];
    let timestamp: f64 = raw_ts
        .parse()
        .with_context(|| format!("invalid timestamp {:?}", raw_ts))?;

    Ok(Some(TraceRecord {
        timestamp: round_to(timestamp, TIMESTAMP_DECIMALS),
        command,
        target: target.to_string(),
    }))
}

/// Parse every line of `reader`.
///
/// `Ok(None)` means no line produced a record. A single retained record
/// yields an empty table, since the first row only anchors the first gap.
pub fn parse_reader<R: BufRead>(reader: R) -> Result<Option<TraceTable>> {
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        match parse_line(&line).with_context(|| format!("line {}", idx + 1))? {
            Some(record) => records.push(record),
            None => skipped += 1,
        }
    }

    debug!(kept = records.len(), skipped, "parsed trace lines");

    if records.is_empty() {
        return Ok(None);
    }
    Ok(Some(TraceTable::from_records(records)))
}

/// Load a trace file. Never fails: problems are logged and yield `None`.
pub fn parse_trace_file(path: impl AsRef<Path>) -> Option<TraceTable> {
    let path = path.as_ref();
    info!("Analyzing file: {}", path.display());

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            error!("File not found: {}", path.display());
            return None;
        }
        Err(e) => {
            error!("Unexpected error while processing {}: {}", path.display(), e);
            return None;
        }
    };

    match parse_reader(BufReader::new(file)) {
        Ok(Some(table)) => {
            info!("Loaded {} rows from {}", table.len(), path.display());
            Some(table)
        }
        Ok(None) => {
            warn!("No valid records with a target found in {}", path.display());
            None
        }
        Err(e) => {
            error!("Unexpected error while processing {}: {:#}", path.display(), e);
            None
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_line_with_target_and_args() {
        let record = parse_line(r#"1700000000.123456 [0 127.0.0.1:6379] "set" "user:1" "value""#)
            .unwrap()
            .unwrap();
        assert_eq!(record.command, "SET");
        assert_eq!(record.target, "user:1");
        assert!((record.timestamp - 1700000000.12346).abs() < 1e-6);
    }

    #[test]
    fn test_parse_line_skips_client_and_targetless() {
        assert!(parse_line(r#"1000.0 [0 ip] "CLIENT""#).unwrap().is_none());
        assert!(parse_line(r#"1000.0 [0 ip] "client" "setname""#)
            .unwrap()
            .is_none());
        assert!(parse_line(r#"1000.0 [0 ip] "PING""#).unwrap().is_none());
        assert!(parse_line(r#"1000.0 [0 ip] "GET" """#).unwrap().is_none());
    }

    #[test]
    fn test_parse_line_skips_garbage() {
        assert!(parse_line("OK").unwrap().is_none());
        assert!(parse_line("").unwrap().is_none());
        assert!(parse_line(r#"1000 [0 ip] "GET" "k""#).unwrap().is_none());
    }

    #[test]
    fn test_parse_reader_two_lines_collapse_to_one_row() {
        let input = "1000.00000 [0 127.0.0.1:1] \"GET\" \"keyA\"\n\
                     1000.00100 [0 127.0.0.1:1] \"GET\" \"keyA\"\n";
        let table = parse_reader(Cursor::new(input)).unwrap().unwrap();
        assert_eq!(table.len(), 1);
        assert!((table.rows()[0].inter_arrival_ms - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_parse_reader_without_matches_is_none() {
        let input = "1000.0 [0 ip] \"CLIENT\"\nnot a log line\n";
        assert!(parse_reader(Cursor::new(input)).unwrap().is_none());
    }

    #[test]
    fn test_parse_reader_skips_non_ascii_digit_timestamps() {
        let input = "1000.00000 [0 127.0.0.1:1] \"GET\" \"keyA\"\n\
                     1000.00100 [0 127.0.0.1:1] \"GET\" \"keyA\"\n\
                     ١٠٠٠.٥ [0 127.0.0.1:1] \"GET\" \"keyB\"\n";
        let table = parse_reader(Cursor::new(input)).unwrap().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].target, "keyA");
    }

    #[test]
    fn test_parse_reader_invalid_utf8_errors() {
        let input: &[u8] = b"1000.0 [0 ip] \"GET\" \"a\"\n1000.1 [0 ip] \"GET\" \"\xff\xfe\"\n";
        let err = parse_reader(Cursor::new(input)).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn test_parse_trace_file_missing_is_none() {
        assert!(parse_trace_file("/definitely/not/here/trace.log").is_none());
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.234567, 5), 1.23457);
        assert_eq!(round_to(2.0, 5), 2.0);
    }
}
