use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde_json::json;

use super::{Notifier, PostResponse};
use crate::api::client::ClientConfig;
use crate::api::http_client::{create_client, ensure_success};
use crate::config::Settings;
use crate::error::{BidwatchError, Result};

/// Slack `chat.postMessage` client authenticated with a bot token
pub struct SlackNotifier {
    api_url: String,
    token: String,
    default_channel: String,
    http_client: Client,
}

impl SlackNotifier {
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
        default_channel: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        Ok(Self {
            api_url: api_url.into(),
            token: token.into(),
            default_channel: default_channel.into(),
            http_client: create_client(&config)?,
        })
    }

    /// Fails with `NoBotToken` when no token is configured
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.slack.api_url.clone(),
            settings.bot_token()?,
            settings.slack.channel_id.clone(),
            ClientConfig::with_timeout(settings.slack.timeout_secs),
        )
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn post(&self, text: &str, channel: Option<&str>) -> Result<PostResponse> {
        let channel = channel.unwrap_or(&self.default_channel);
        let payload = json!({
            "channel": channel,
            "text": text,
        });

        let response = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;
        let response = ensure_success(response)?;

        let body = response.text().await?;
        let data: PostResponse = serde_json::from_str(&body).map_err(|e| {
            BidwatchError::Parse(format!("Unexpected Slack response: {}", e))
        })?;

        if data.ok {
            debug!("Posted to Slack channel {}", channel);
        } else {
            error!(
                "Slack rejected message for channel {}: {}",
                channel,
                data.error.as_deref().unwrap_or("unknown error")
            );
        }
        Ok(data)
    }
}
