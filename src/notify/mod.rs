pub mod slack;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::api::types::BidRecord;
use crate::error::Result;

pub use slack::SlackNotifier;

/// Result of one message delivery as reported by the channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
}

/// Message delivery to an external channel
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post `text` to `channel`, or to the default channel when `None`.
    ///
    /// A rejection reported by the channel comes back as `ok == false`, not
    /// as an error.
    async fn post(&self, text: &str, channel: Option<&str>) -> Result<PostResponse>;
}

/// Render a record as a Slack message
pub fn format_message(record: &BidRecord) -> String {
    [
        format!("📋 *{}*", record.title),
        format!("🏢 {}", record.organization),
        format!("📍 {}", record.location()).trim().to_string(),
        format!("📁 {}", record.category),
        format!("📅 公告日: {}", record.cft_issue_date),
        format!("🔗 {}", record.url),
    ]
    .join("\n")
}
