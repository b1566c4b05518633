pub mod formatter;

pub use formatter::Formatter;

use crate::api::types::BidRecord;
use crate::cli::OutputFormat;
use crate::error::Result;
use crate::runner::RunSummary;

/// Format records based on the specified format
pub fn format_records(records: &[BidRecord], source: &str, format: OutputFormat) -> Result<String> {
    let formatter = Formatter::new(format);
    formatter.format_records(records, source)
}

/// Format a run summary based on the specified format
pub fn format_summary(summary: &RunSummary, format: OutputFormat) -> Result<String> {
    let formatter = Formatter::new(format);
    formatter.format_summary(summary)
}
