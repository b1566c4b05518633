use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{BidwatchError, Result};

/// Value used for organization and category when the source leaves them out
pub const PLACEHOLDER: &str = "不明";

/// Canonical bid announcement, identical in shape whatever source produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidRecord {
    /// Source-assigned key, used for deduplication
    pub id: String,
    /// Project or announcement name
    pub title: String,
    /// Issuing body
    pub organization: String,
    pub prefecture: String,
    pub city: String,
    pub category: String,
    /// Issue date as `YYYY-MM-DD`
    pub cft_issue_date: String,
    /// Absolute link to the announcement
    pub url: String,
}

impl BidRecord {
    /// Prefecture and city joined for display
    pub fn location(&self) -> String {
        format!("{} {}", self.prefecture, self.city).trim().to_string()
    }
}

/// Search request shared by every source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text query; ignored by the listing scraper
    pub keyword: String,
    /// Result count cap, defaults to the configured maximum
    pub count: Option<u32>,
    /// Issue-date range (`YYYY-MM-DD/YYYY-MM-DD`), defaults to the lookback window
    pub cft_issue_date: Option<String>,
    /// Lookback window in days
    pub days_back: u32,
}

impl SearchRequest {
    pub fn new(keyword: impl Into<String>, days_back: u32) -> Self {
        Self {
            keyword: keyword.into(),
            count: None,
            cft_issue_date: None,
            days_back,
        }
    }

    /// Request for sources that take only a lookback window
    pub fn lookback(days_back: u32) -> Self {
        Self::new(String::new(), days_back)
    }

    /// Explicit date range, or the lookback window ending `today`
    pub fn date_range(&self, today: NaiveDate) -> Result<String> {
        match &self.cft_issue_date {
            Some(range) => Ok(range.clone()),
            None => cft_issue_date_range(today, self.days_back),
        }
    }
}

/// First day of the `days_back` window ending `today`
pub fn lookback_start(today: NaiveDate, days_back: u32) -> Result<NaiveDate> {
    today
        .checked_sub_signed(Duration::days(i64::from(days_back)))
        .ok_or_else(|| {
            BidwatchError::InvalidInput(format!("lookback of {} days is out of range", days_back))
        })
}

/// Build the `from/to` issue-date range covering the last `days_back` days
pub fn cft_issue_date_range(today: NaiveDate, days_back: u32) -> Result<String> {
    let start = lookback_start(today, days_back)?;
    Ok(format!("{}/{}", start.format("%Y-%m-%d"), today.format("%Y-%m-%d")))
}
