use colored::*;
use log::warn;

use crate::api::{FallbackSearch, SearchRequest, SourceFactory, SourceType};
use crate::cli::args::SearchArgs;
use crate::cli::OutputFormat;
use crate::config::{check_days_back, check_result_count, Settings};
use crate::error::{BidwatchError, Result};
use crate::output;

/// Execute a single keyword search and print the records
pub async fn execute(args: SearchArgs, settings: &Settings, format: OutputFormat) -> Result<()> {
    let request = build_request(&args, settings)?;

    let (records, source) = match parse_source(&args.source)? {
        None => {
            let search = FallbackSearch::new(
                SourceFactory::create(SourceType::Mcp, settings)?,
                SourceFactory::create(SourceType::Kkj, settings)?,
            );
            let outcome = search.search(&request).await?;
            let source = if outcome.used_fallback() {
                SourceType::Kkj
            } else {
                SourceType::Mcp
            };
            (outcome.into_records(), source)
        }
        Some(source_type) => {
            let source = SourceFactory::create(source_type, settings)?;
            (source.search(&request).await?, source_type)
        }
    };

    if records.is_empty() && format == OutputFormat::Table {
        println!("{}", "No results found.".yellow());
        return Ok(());
    }

    println!("{}", output::format_records(&records, source.display_name(), format)?);
    Ok(())
}

/// Validate the arguments and turn them into a request
fn build_request(args: &SearchArgs, settings: &Settings) -> Result<SearchRequest> {
    if args.keyword.trim().is_empty() {
        return Err(BidwatchError::InvalidInput(
            "Search keyword cannot be empty".to_string(),
        ));
    }

    let days = check_days_back(args.days.unwrap_or(settings.search.days_back))?;
    let mut request = SearchRequest::new(args.keyword.trim(), days);
    request.count = args.count.map(check_result_count).transpose()?;
    request.cft_issue_date = args.date_range.clone();
    Ok(request)
}

/// `auto` means MCP with KKJ fallback, reported as `None`
fn parse_source(source: &str) -> Result<Option<SourceType>> {
    if source.eq_ignore_ascii_case("auto") {
        return Ok(None);
    }
    match SourceType::from_str(source) {
        Some(SourceType::SportsAgency) => {
            warn!("The listing page has no keyword search; use `bidwatch scrape`");
            Err(BidwatchError::InvalidInput(
                "source must be one of auto, mcp, kkj".to_string(),
            ))
        }
        Some(source_type) => Ok(Some(source_type)),
        None => Err(BidwatchError::InvalidInput(format!(
            "Unknown source '{}': expected auto, mcp or kkj",
            source
        ))),
    }
}
