pub mod args;
pub mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::config::Settings;
use crate::error::{BidwatchError, ErrorKind};

/// Public procurement bid watcher
#[derive(Parser, Debug)]
#[command(
    name = "bidwatch",
    about = "Collect new procurement notices and post them to Slack",
    version,
    author,
    long_about = None
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to ~/.config/bidwatch/config.yaml)
    #[arg(short, long, global = true, env = "BIDWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Markdown format
    Markdown,
    /// CSV format
    Csv,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search all keywords, notify new notices and update the sent-id store (default)
    #[command(alias = "r")]
    Run(args::RunArgs),

    /// Search a single keyword without notifying
    #[command(alias = "s")]
    Search(args::SearchArgs),

    /// Scrape the Sports Agency listing page without notifying
    Scrape(args::ScrapeArgs),

    /// Inspect configuration
    #[command(alias = "c")]
    Config(args::ConfigArgs),

    /// Generate shell completion scripts
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Generate shell completion scripts
    fn generate_completions(shell: Shell) {
        use clap::CommandFactory;
        use clap_complete::generate;
        use std::io;

        let mut cmd = Self::command();
        let name = cmd.get_name().to_string();
        generate(shell, &mut cmd, name, &mut io::stdout());
    }

    fn init_logging(verbose: bool, level: &str) {
        let filter = if verbose { "debug" } else { level };
        // RUST_LOG still wins over the configured level
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
            .format_timestamp_secs()
            .try_init();
    }

    /// Run the CLI application
    pub async fn run() -> crate::error::Result<()> {
        let cli = Self::parse();
        let command = cli
            .command
            .unwrap_or_else(|| Commands::Run(args::RunArgs::default()));

        if let Commands::Completions { shell } = command {
            Self::generate_completions(shell);
            return Ok(());
        }

        let settings = match Settings::load(cli.config.as_deref()) {
            Ok(settings) => settings,
            Err(e) => {
                Self::init_logging(cli.verbose, "warn");
                report_error(&e, cli.verbose);
                return Err(e);
            }
        };
        Self::init_logging(cli.verbose, &settings.log_level);

        let result = match command {
            Commands::Run(args) => commands::run::execute(args, &settings, cli.format).await,
            Commands::Search(args) => commands::search::execute(args, &settings, cli.format).await,
            Commands::Scrape(args) => commands::scrape::execute(args, &settings, cli.format).await,
            Commands::Config(args) => {
                commands::config::execute(args, &settings, cli.config.as_deref())
            }
            Commands::Completions { .. } => Ok(()),
        };

        if let Err(e) = &result {
            report_error(e, cli.verbose);
        }
        result
    }
}

/// Print an error with its hint in the operator-facing form
fn report_error(e: &BidwatchError, verbose: bool) {
    match e {
        BidwatchError::NoBotToken => {
            eprintln!("Error: No Slack bot token configured.");
            eprintln!("\nSet it in the environment:");
            eprintln!("  export SLACK_BOT_TOKEN=xoxb-...");
            eprintln!("or in the configuration file under slack.bot_token.");
            eprintln!("Use `bidwatch run --dry-run` to preview without a token.");
            return;
        }
        BidwatchError::Network(err) => {
            eprintln!("Network error: {}", err);
        }
        BidwatchError::Parse(msg) => {
            eprintln!("Error parsing response: {}", msg);
            if !verbose {
                eprintln!("\nRun with --verbose for more details.");
            }
        }
        _ => {
            eprintln!("Error: {}", e);
        }
    }

    if let Some(hint) = e.hint() {
        eprintln!("\nHint: {}", hint);
    }
    if verbose && e.kind() != ErrorKind::Local {
        eprintln!("Kind: {:?}", e.kind());
    }
}
