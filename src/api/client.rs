use async_trait::async_trait;

use super::kkj::KkjClient;
use super::mcp::McpClient;
use super::sports_agency::SportsAgencyClient;
use super::types::{BidRecord, SearchRequest};
use super::SourceType;
use crate::config::Settings;
use crate::error::Result;

/// A place bid announcements can be collected from
#[async_trait]
pub trait BidSource: Send + Sync {
    /// Search for announcements, normalized to canonical records
    async fn search(&self, request: &SearchRequest) -> Result<Vec<BidRecord>>;

    /// Get the source type
    fn source_type(&self) -> SourceType;

    /// Get the endpoint this source talks to
    fn base_url(&self) -> &str;
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout in seconds
    pub timeout: u64,
    /// User agent string
    pub user_agent: String,
}

impl ClientConfig {
    pub fn with_timeout(timeout: u64) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            user_agent: format!("bidwatch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Factory for creating sources from settings
pub struct SourceFactory;

impl SourceFactory {
    /// Create a new source based on the source type
    pub fn create(source_type: SourceType, settings: &Settings) -> Result<Box<dyn BidSource>> {
        match source_type {
            SourceType::Mcp => Ok(Box::new(McpClient::from_settings(settings)?)),
            SourceType::Kkj => Ok(Box::new(KkjClient::from_settings(settings)?)),
            SourceType::SportsAgency => Ok(Box::new(SportsAgencyClient::from_settings(settings)?)),
        }
    }
}
