use thiserror::Error;

#[derive(Debug, Error)]
pub enum BidwatchError {
    #[error("Slack bot token not configured. Set SLACK_BOT_TOKEN or slack.bot_token.")]
    NoBotToken,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Protocol error from {source_name}: {message}")]
    Protocol {
        source_name: String,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

/// Coarse classification used when deciding how a failure is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Timeout, connection failure or non-2xx status
    Transport,
    /// Well-formed response carrying an explicit error
    Protocol,
    /// Response body that could not be understood
    Parse,
    /// Configuration, filesystem and everything else on this side of the wire
    Local,
}

impl BidwatchError {
    pub fn protocol(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Protocol {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) | Self::HttpStatus { .. } => ErrorKind::Transport,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::Parse(_) | Self::Serialization(_) => ErrorKind::Parse,
            _ => ErrorKind::Local,
        }
    }

    /// Get operator-facing hint for the error
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NoBotToken => Some(
                "Create a Slack app with chat:write and export its bot token as SLACK_BOT_TOKEN, \
                 or run with --dry-run."
                    .to_string(),
            ),
            Self::Network(_) => Some("Check your internet connection and try again.".to_string()),
            Self::HttpStatus { status, .. } if *status == 401 || *status == 403 => {
                Some("The endpoint rejected the credentials.".to_string())
            }
            Self::Config(_) => Some(
                "Run 'bidwatch config show' to inspect the effective settings.".to_string(),
            ),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BidwatchError>;
