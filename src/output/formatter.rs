use colored::*;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use serde_json;

use crate::api::types::BidRecord;
use crate::cli::OutputFormat;
use crate::error::{BidwatchError, Result};
use crate::runner::RunSummary;

pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Format a list of records collected from `source`
    pub fn format_records(&self, records: &[BidRecord], source: &str) -> Result<String> {
        match self.format {
            OutputFormat::Table => self.format_records_table(records, source),
            OutputFormat::Json => self.format_records_json(records),
            OutputFormat::Markdown => self.format_records_markdown(records, source),
            OutputFormat::Csv => self.format_records_csv(records),
        }
    }

    /// Format the counters of a finished run
    pub fn format_summary(&self, summary: &RunSummary) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
            _ => Ok(format!(
                "{} keywords: {} (failed {}, fallback {}) | fetched: {} | new: {} | notified: {} | delivery failures: {}",
                "📊".cyan(),
                summary.keywords_searched.to_string().yellow(),
                summary.keyword_failures,
                summary.fallbacks_used,
                summary.records_fetched.to_string().yellow(),
                summary.new_records.to_string().yellow(),
                summary.notified.to_string().green(),
                if summary.delivery_failures > 0 {
                    summary.delivery_failures.to_string().red()
                } else {
                    summary.delivery_failures.to_string().normal()
                },
            )),
        }
    }

    fn format_records_table(&self, records: &[BidRecord], source: &str) -> Result<String> {
        let mut table = Table::new();

        table.set_header(vec![
            Cell::new("No.").fg(Color::Cyan),
            Cell::new("公告日").fg(Color::Cyan),
            Cell::new("案件名").fg(Color::Cyan),
            Cell::new("機関").fg(Color::Cyan),
            Cell::new("所在地").fg(Color::Cyan),
            Cell::new("種別").fg(Color::Cyan),
            Cell::new("ID").fg(Color::Cyan),
        ]);

        for (idx, record) in records.iter().enumerate() {
            table.add_row(vec![
                Cell::new((idx + 1).to_string()),
                Cell::new(or_dash(&record.cft_issue_date)),
                Cell::new(truncate_string(&record.title, 40)),
                Cell::new(truncate_string(&record.organization, 20)),
                Cell::new(or_dash(&record.location())),
                Cell::new(&record.category),
                Cell::new(truncate_string(&record.id, 24)),
            ]);
        }

        table.set_content_arrangement(ContentArrangement::Dynamic);

        let mut result = String::new();
        result.push_str(&format!(
            "\n{} Source: {} | Results: {}\n\n",
            "📊".cyan(),
            source.yellow(),
            records.len().to_string().yellow()
        ));
        result.push_str(&table.to_string());

        Ok(result)
    }

    fn format_records_json(&self, records: &[BidRecord]) -> Result<String> {
        serde_json::to_string_pretty(records).map_err(BidwatchError::Serialization)
    }

    fn format_records_markdown(&self, records: &[BidRecord], source: &str) -> Result<String> {
        let mut result = String::new();

        result.push_str("# 入札情報\n\n");
        result.push_str(&format!("- **件数**: {}\n", records.len()));
        result.push_str(&format!("- **出典**: {}\n\n", source));

        result.push_str("| No. | 公告日 | 案件名 | 機関 | 所在地 | 種別 |\n");
        result.push_str("|-----|--------|--------|------|--------|------|\n");

        for (idx, record) in records.iter().enumerate() {
            let title = if record.url.is_empty() {
                escape_markdown(&record.title)
            } else {
                format!("[{}]({})", escape_markdown(&record.title), record.url)
            };
            result.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                idx + 1,
                or_dash(&record.cft_issue_date),
                title,
                escape_markdown(&record.organization),
                or_dash(&record.location()),
                escape_markdown(&record.category),
            ));
        }

        Ok(result)
    }

    fn format_records_csv(&self, records: &[BidRecord]) -> Result<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);

        wtr.write_record([
            "id",
            "title",
            "organization",
            "prefecture",
            "city",
            "category",
            "cft_issue_date",
            "url",
        ])?;

        for record in records {
            wtr.write_record([
                &record.id,
                &record.title,
                &record.organization,
                &record.prefecture,
                &record.city,
                &record.category,
                &record.cft_issue_date,
                &record.url,
            ])?;
        }

        let data = wtr
            .into_inner()
            .map_err(|e| BidwatchError::Other(e.to_string()))?;

        // Add BOM for Excel compatibility
        let mut result = vec![0xEF, 0xBB, 0xBF];
        result.extend_from_slice(&data);

        String::from_utf8(result).map_err(|e| BidwatchError::Other(e.to_string()))
    }
}

fn or_dash(s: &str) -> String {
    if s.is_empty() {
        "-".to_string()
    } else {
        s.to_string()
    }
}

fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

fn escape_markdown(s: &str) -> String {
    s.replace('|', "\\|")
        .replace('*', "\\*")
        .replace('_', "\\_")
}
