use log::{debug, warn};

use super::client::BidSource;
use super::types::{BidRecord, SearchRequest};
use crate::error::{BidwatchError, Result};

/// Which source answered a search
#[derive(Debug)]
pub enum SearchOutcome {
    /// The primary source succeeded
    Primary(Vec<BidRecord>),
    /// The primary source failed with `reason`; the secondary answered
    Fallback {
        records: Vec<BidRecord>,
        reason: BidwatchError,
    },
}

impl SearchOutcome {
    pub fn records(&self) -> &[BidRecord] {
        match self {
            Self::Primary(records) | Self::Fallback { records, .. } => records,
        }
    }

    pub fn into_records(self) -> Vec<BidRecord> {
        match self {
            Self::Primary(records) | Self::Fallback { records, .. } => records,
        }
    }

    pub fn used_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Search through a primary source, switching to a secondary one on failure.
///
/// The secondary is tried at most once per search and its error, if any,
/// is returned to the caller.
pub struct FallbackSearch {
    primary: Box<dyn BidSource>,
    secondary: Box<dyn BidSource>,
}

impl FallbackSearch {
    pub fn new(primary: Box<dyn BidSource>, secondary: Box<dyn BidSource>) -> Self {
        Self { primary, secondary }
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome> {
        match self.primary.search(request).await {
            Ok(records) => {
                debug!(
                    "{} answered keyword={} with {} records",
                    self.primary.source_type().as_str(),
                    request.keyword,
                    records.len()
                );
                Ok(SearchOutcome::Primary(records))
            }
            Err(reason) => {
                warn!(
                    "{} search failed (keyword={}), falling back to {}: {}",
                    self.primary.source_type().as_str(),
                    request.keyword,
                    self.secondary.source_type().as_str(),
                    reason
                );
                let records = self.secondary.search(request).await?;
                Ok(SearchOutcome::Fallback { records, reason })
            }
        }
    }
}
