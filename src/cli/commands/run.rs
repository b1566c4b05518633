use crate::cli::args::RunArgs;
use crate::cli::OutputFormat;
use crate::config::Settings;
use crate::error::Result;
use crate::output;
use crate::runner::Runner;
use crate::store::SentIdStore;

/// Execute a full collection run
pub async fn execute(args: RunArgs, settings: &Settings, format: OutputFormat) -> Result<()> {
    let runner = Runner::from_settings(settings, args.dry_run, !args.no_scrape)?;
    let mut store = SentIdStore::load(&settings.storage.sent_ids_path);

    let summary = runner.run(&mut store).await?;

    eprintln!("{}", output::format_summary(&summary, format)?);
    Ok(())
}
