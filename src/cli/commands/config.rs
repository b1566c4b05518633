use std::path::Path;

use crate::cli::args::{ConfigArgs, ConfigCommand};
use crate::config::Settings;
use crate::error::{BidwatchError, Result};

/// Execute config command
pub fn execute(args: ConfigArgs, settings: &Settings, explicit_path: Option<&Path>) -> Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let mut shown = settings.clone();
            shown.slack.bot_token = None;
            let yaml = serde_yaml::to_string(&shown).map_err(|e| {
                BidwatchError::Config(format!("Failed to render configuration: {}", e))
            })?;
            print!("{}", yaml);
            match settings.slack.bot_token.as_deref() {
                Some(token) => println!("# slack.bot_token: {}", mask_value(token)),
                None => println!("# slack.bot_token: (not set)"),
            }
            Ok(())
        }
        ConfigCommand::Path => {
            let path = match explicit_path {
                Some(p) => p.to_path_buf(),
                None => Settings::config_file_path()?,
            };
            let status = if path.exists() { "" } else { " (not found)" };
            println!("Configuration file: {}{}", path.display(), status);
            println!("Sent-id store: {}", settings.storage.sent_ids_path.display());
            Ok(())
        }
    }
}

/// Mask sensitive values for display
fn mask_value(value: &str) -> String {
    let count = value.chars().count();
    if count > 10 {
        let head: String = value.chars().take(10).collect();
        format!("{}...({} characters)", head, count)
    } else {
        "*".repeat(count)
    }
}
