//! Trace loading
//!
//! Turns key-value store command logs into [`TraceTable`]s.

pub mod parser;
pub mod table;

pub use parser::{parse_line, parse_reader, parse_trace_file};
pub use table::{value_counts, TraceRecord, TraceRow, TraceTable};
