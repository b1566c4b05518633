use colored::*;

use crate::api::sports_agency::SportsAgencyClient;
use crate::api::SourceType;
use crate::cli::args::ScrapeArgs;
use crate::cli::OutputFormat;
use crate::config::{check_days_back, Settings};
use crate::error::Result;
use crate::output;

/// Execute a listing scrape and print the records
pub async fn execute(args: ScrapeArgs, settings: &Settings, format: OutputFormat) -> Result<()> {
    let days = check_days_back(args.days.unwrap_or(settings.search.days_back))?;
    let client = SportsAgencyClient::from_settings(settings)?;
    let records = client.fetch(days).await?;

    if records.is_empty() && format == OutputFormat::Table {
        println!("{}", "No announcements in the lookback window.".yellow());
        return Ok(());
    }

    println!(
        "{}",
        output::format_records(&records, SourceType::SportsAgency.display_name(), format)?
    );
    Ok(())
}
