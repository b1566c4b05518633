//! Field mapping from upstream schemas to [`BidRecord`].
//!
//! The MCP search tool and the KKJ XML API name their fields the same way but
//! deliver them differently (typed JSON vs. tag text), so each has its own
//! mapping table. Both funnel into [`RawBid::into_record`], which applies the
//! placeholder and date rules.

use serde::Deserialize;

use super::deserializers::lenient_string;
use super::types::{BidRecord, PLACEHOLDER};

/// Canonical field a source value maps onto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidField {
    Id,
    Title,
    Organization,
    Prefecture,
    City,
    Category,
    CftIssueDate,
    Url,
}

/// KKJ XML tag table
const KKJ_TAGS: [(&str, BidField); 8] = [
    ("Key", BidField::Id),
    ("ProjectName", BidField::Title),
    ("OrganizationName", BidField::Organization),
    ("PrefectureName", BidField::Prefecture),
    ("CityName", BidField::City),
    ("Category", BidField::Category),
    ("CftIssueDate", BidField::CftIssueDate),
    ("ExternalDocumentURI", BidField::Url),
];

/// Look up the canonical field for a KKJ XML tag
pub fn kkj_field(tag: &str) -> Option<BidField> {
    KKJ_TAGS
        .iter()
        .find(|(name, _)| *name == tag)
        .map(|(_, field)| *field)
}

/// One `SearchResult` entry returned by the MCP search tool
#[derive(Debug, Default, Deserialize)]
pub struct McpSearchItem {
    #[serde(rename = "Key", default, deserialize_with = "lenient_string")]
    pub key: Option<String>,
    #[serde(rename = "ProjectName", default, deserialize_with = "lenient_string")]
    pub project_name: Option<String>,
    #[serde(rename = "OrganizationName", default, deserialize_with = "lenient_string")]
    pub organization_name: Option<String>,
    #[serde(rename = "PrefectureName", default, deserialize_with = "lenient_string")]
    pub prefecture_name: Option<String>,
    #[serde(rename = "CityName", default, deserialize_with = "lenient_string")]
    pub city_name: Option<String>,
    #[serde(rename = "Category", default, deserialize_with = "lenient_string")]
    pub category: Option<String>,
    #[serde(rename = "CftIssueDate", default, deserialize_with = "lenient_string")]
    pub cft_issue_date: Option<String>,
    #[serde(rename = "ExternalDocumentURI", default, deserialize_with = "lenient_string")]
    pub external_document_uri: Option<String>,
}

impl McpSearchItem {
    pub fn into_record(self) -> Option<BidRecord> {
        RawBid {
            id: self.key,
            title: self.project_name,
            organization: self.organization_name,
            prefecture: self.prefecture_name,
            city: self.city_name,
            category: self.category,
            cft_issue_date: self.cft_issue_date,
            url: self.external_document_uri,
        }
        .into_record()
    }
}

/// Source values collected before normalization
#[derive(Debug, Default, Clone)]
pub struct RawBid {
    pub id: Option<String>,
    pub title: Option<String>,
    pub organization: Option<String>,
    pub prefecture: Option<String>,
    pub city: Option<String>,
    pub category: Option<String>,
    pub cft_issue_date: Option<String>,
    pub url: Option<String>,
}

impl RawBid {
    /// Append text to a field; XML text can arrive in several chunks
    pub fn push(&mut self, field: BidField, text: &str) {
        let slot = match field {
            BidField::Id => &mut self.id,
            BidField::Title => &mut self.title,
            BidField::Organization => &mut self.organization,
            BidField::Prefecture => &mut self.prefecture,
            BidField::City => &mut self.city,
            BidField::Category => &mut self.category,
            BidField::CftIssueDate => &mut self.cft_issue_date,
            BidField::Url => &mut self.url,
        };
        slot.get_or_insert_with(String::new).push_str(text);
    }

    /// Build the canonical record. Returns `None` when the id is missing.
    pub fn into_record(self) -> Option<BidRecord> {
        let id = non_empty(self.id)?;

        Some(BidRecord {
            id,
            title: non_empty(self.title).unwrap_or_default(),
            organization: non_empty(self.organization).unwrap_or_else(|| PLACEHOLDER.to_string()),
            prefecture: non_empty(self.prefecture).unwrap_or_default(),
            city: non_empty(self.city).unwrap_or_default(),
            category: non_empty(self.category).unwrap_or_else(|| PLACEHOLDER.to_string()),
            cft_issue_date: self
                .cft_issue_date
                .map(|d| truncate_date(&d))
                .unwrap_or_default(),
            url: non_empty(self.url).unwrap_or_default(),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Keep the `YYYY-MM-DD` head of a timestamp
pub fn truncate_date(value: &str) -> String {
    value.trim().chars().take(10).collect()
}
