use clap::{Args, Subcommand};

/// Collection run arguments
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Print messages instead of posting them and leave the store untouched
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the Sports Agency listing page
    #[arg(long)]
    pub no_scrape: bool,
}

/// Single keyword search arguments
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search keyword
    pub keyword: String,

    /// Source to query (auto, mcp, kkj)
    #[arg(short, long, default_value = "auto")]
    pub source: String,

    /// Maximum number of results
    #[arg(short = 'n', long)]
    pub count: Option<u32>,

    /// Lookback window in days (overrides search.days_back)
    #[arg(short, long)]
    pub days: Option<u32>,

    /// Explicit issue-date range, e.g. 2024-04-01/2024-04-07
    #[arg(long)]
    pub date_range: Option<String>,
}

/// Listing scrape arguments
#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// Lookback window in days (overrides search.days_back)
    #[arg(short, long)]
    pub days: Option<u32>,
}

/// Configuration management arguments
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Show configuration file path
    Path,
}
