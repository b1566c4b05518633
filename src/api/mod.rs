pub mod client;
pub mod deserializers;
pub mod fallback;
pub mod http_client;
pub mod kkj;
pub mod mcp;
pub mod normalize;
pub mod sports_agency;
pub mod types;

pub use client::{BidSource, SourceFactory};
pub use fallback::{FallbackSearch, SearchOutcome};
pub use types::{BidRecord, SearchRequest};

/// Sources the watcher can collect from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    /// KKJ search tool reached over MCP (primary)
    Mcp,
    /// KKJ XML API called directly (fallback)
    Kkj,
    /// Japan Sports Agency call-for-proposals listing page
    SportsAgency,
}

impl SourceType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mcp" => Some(Self::Mcp),
            "kkj" | "api" => Some(Self::Kkj),
            "sports" | "sports-agency" | "jsa" => Some(Self::SportsAgency),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mcp => "mcp",
            Self::Kkj => "kkj",
            Self::SportsAgency => "sports-agency",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Mcp => "官公需検索 (MCP)",
            Self::Kkj => "官公需情報ポータル API",
            Self::SportsAgency => "スポーツ庁 公募情報",
        }
    }
}
