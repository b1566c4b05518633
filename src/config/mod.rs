use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::env;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use crate::error::{BidwatchError, Result};

const CONFIG_DIR_NAME: &str = "bidwatch";
const CONFIG_FILE_NAME: &str = "config.yaml";
const ENV_PREFIX: &str = "BIDWATCH";

/// Allowed lookback window in days
pub const DAYS_BACK_RANGE: RangeInclusive<u32> = 1..=3650;
/// Allowed per-query result count
pub const RESULT_COUNT_RANGE: RangeInclusive<u32> = 1..=1000;

/// Keywords searched on every run.
pub const SEARCH_KEYWORDS: [&str; 10] = [
    "スポーツ",
    "アーバンスポーツ",
    "スケートボード",
    "BMX",
    "クライミング",
    "サーフィン",
    "ブレイキン",
    "体育館",
    "スポーツ施設",
    "運動公園",
];

/// Flat environment variables kept for existing deployments.
/// Each maps onto a nested settings key.
const LEGACY_ENV_VARS: [(&str, &str); 7] = [
    ("SLACK_BOT_TOKEN", "slack.bot_token"),
    ("SLACK_CHANNEL_ID", "slack.channel_id"),
    ("SEARCH_DAYS_BACK", "search.days_back"),
    ("MAX_RESULTS_PER_QUERY", "search.max_results_per_query"),
    ("MCP_SERVER_URL", "mcp.server_url"),
    ("LOG_LEVEL", "log_level"),
    ("SENT_IDS_PATH", "storage.sent_ids_path"),
];

/// Application settings, built once at startup and passed to every component
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub slack: SlackSettings,
    pub search: SearchSettings,
    pub mcp: McpSettings,
    pub kkj: KkjSettings,
    pub sports_agency: SportsAgencySettings,
    pub storage: StorageSettings,
    /// env_logger filter used when RUST_LOG is unset
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
    pub channel_id: String,
    pub api_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Lookback window for the issue-date range, in days
    pub days_back: u32,
    pub max_results_per_query: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpSettings {
    pub server_url: String,
    pub tool_name: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KkjSettings {
    pub api_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SportsAgencySettings {
    pub enabled: bool,
    pub listing_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub sent_ids_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            slack: SlackSettings::default(),
            search: SearchSettings::default(),
            mcp: McpSettings::default(),
            kkj: KkjSettings::default(),
            sports_agency: SportsAgencySettings::default(),
            storage: StorageSettings::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for SlackSettings {
    fn default() -> Self {
        Self {
            bot_token: None,
            channel_id: "C0AF5TBN89X".to_string(),
            api_url: "https://slack.com/api/chat.postMessage".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            days_back: 7,
            max_results_per_query: 200,
        }
    }
}

impl Default for McpSettings {
    fn default() -> Self {
        Self {
            server_url: "https://mcp.n-3.ai/mcp?tools=kkj-search".to_string(),
            tool_name: "kkj-search".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for KkjSettings {
    fn default() -> Self {
        Self {
            api_url: "http://www.kkj.go.jp/api/".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for SportsAgencySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            listing_url: "https://www.mext.go.jp/sports/b_menu/boshu/index.htm".to_string(),
            timeout_secs: 15,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            sent_ids_path: PathBuf::from("data").join("sent_ids.json"),
        }
    }
}

impl Settings {
    /// Default configuration file location (`~/.config/bidwatch/config.yaml`)
    pub fn config_file_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            BidwatchError::Config("Could not determine configuration directory".to_string())
        })?;

        Ok(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load settings from defaults, an optional YAML file and the environment.
    ///
    /// Later layers win: defaults, then the file, then `BIDWATCH__SECTION__KEY`
    /// variables, then the flat legacy variables such as `SLACK_BOT_TOKEN`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        load_dotenv(None);

        let file_path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::config_file_path().ok(),
        };
        // An explicitly named file must exist; the default one is optional.
        let file_required = path.is_some();

        let defaults = config::Config::try_from(&Settings::default())
            .map_err(|e| BidwatchError::Config(format!("Failed to build defaults: {}", e)))?;

        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(file_path) = file_path {
            builder = builder.add_source(
                File::from(file_path)
                    .format(FileFormat::Yaml)
                    .required(file_required),
            );
        }

        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        for (var, key) in LEGACY_ENV_VARS {
            let value = env::var(var).ok().filter(|v| !v.trim().is_empty());
            builder = builder
                .set_override_option(key, value)
                .map_err(|e| BidwatchError::Config(format!("Invalid value for {}: {}", var, e)))?;
        }

        let settings: Settings = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| BidwatchError::Config(format!("Failed to load configuration: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check value ranges that the remote APIs would otherwise reject
    pub fn validate(&self) -> Result<()> {
        check_days_back(self.search.days_back)
            .map_err(|_| range_error("search.days_back", &DAYS_BACK_RANGE, self.search.days_back))?;
        check_result_count(self.search.max_results_per_query).map_err(|_| {
            range_error(
                "search.max_results_per_query",
                &RESULT_COUNT_RANGE,
                self.search.max_results_per_query,
            )
        })?;
        if self.slack.channel_id.trim().is_empty() {
            return Err(BidwatchError::Config(
                "slack.channel_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Bot token, or `NoBotToken` when it is missing or blank
    pub fn bot_token(&self) -> Result<&str> {
        self.slack
            .bot_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(BidwatchError::NoBotToken)
    }

    /// The compiled-in keyword list
    pub fn keywords(&self) -> Vec<String> {
        SEARCH_KEYWORDS.iter().map(|k| k.to_string()).collect()
    }
}

/// Read a `.env` file into the process environment, returning its path.
///
/// With no explicit path the file is searched from the working directory
/// upwards. Variables already set in the environment are kept.
pub fn load_dotenv(path: Option<&Path>) -> Option<PathBuf> {
    match path {
        Some(p) => dotenvy::from_path(p).ok().map(|_| p.to_path_buf()),
        None => dotenvy::dotenv().ok(),
    }
}

/// Reject lookback windows outside `DAYS_BACK_RANGE`
pub fn check_days_back(days: u32) -> Result<u32> {
    if DAYS_BACK_RANGE.contains(&days) {
        Ok(days)
    } else {
        Err(BidwatchError::InvalidInput(format!(
            "days must be between {} and {}, got {}",
            DAYS_BACK_RANGE.start(),
            DAYS_BACK_RANGE.end(),
            days
        )))
    }
}

/// Reject result counts outside `RESULT_COUNT_RANGE`
pub fn check_result_count(count: u32) -> Result<u32> {
    if RESULT_COUNT_RANGE.contains(&count) {
        Ok(count)
    } else {
        Err(BidwatchError::InvalidInput(format!(
            "count must be between {} and {}, got {}",
            RESULT_COUNT_RANGE.start(),
            RESULT_COUNT_RANGE.end(),
            count
        )))
    }
}

fn range_error(key: &str, range: &RangeInclusive<u32>, value: u32) -> BidwatchError {
    BidwatchError::Config(format!(
        "{} must be between {} and {}, got {}",
        key,
        range.start(),
        range.end(),
        value
    ))
}
