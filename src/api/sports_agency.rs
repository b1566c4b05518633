use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use encoding_rs::{Encoding, SHIFT_JIS, UTF_8};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::client::ClientConfig;
use super::http_client::{create_client, ensure_success};
use super::types::{lookback_start, BidRecord, SearchRequest};
use super::{BidSource, SourceType};
use crate::config::Settings;
use crate::era::parse_era_date;
use crate::error::{BidwatchError, Result};

const ORGANIZATION: &str = "スポーツ庁";
const PREFECTURE: &str = "東京都";
const CATEGORY: &str = "公募";

static DT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("dt").expect("dt selector is valid"));
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("link selector is valid"));
static JSA_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"jsa_\d+").expect("id pattern is valid"));
static META_CHARSET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?\s*([A-Za-z0-9_\-]+)"#)
        .expect("charset pattern is valid")
});

/// Scraper for the Japan Sports Agency call-for-proposals (公募情報) page
pub struct SportsAgencyClient {
    listing_url: Url,
    http_client: Client,
}

impl SportsAgencyClient {
    pub fn new(listing_url: &str, config: ClientConfig) -> Result<Self> {
        let listing_url = Url::parse(listing_url).map_err(|e| {
            BidwatchError::Config(format!("Invalid sports agency listing URL: {}", e))
        })?;

        Ok(Self {
            listing_url,
            http_client: create_client(&config)?,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            &settings.sports_agency.listing_url,
            ClientConfig::with_timeout(settings.sports_agency.timeout_secs),
        )
    }

    /// Fetch announcements posted within the last `days_back` days
    pub async fn fetch(&self, days_back: u32) -> Result<Vec<BidRecord>> {
        let cutoff = lookback_start(Local::now().date_naive(), days_back)?;
        info!("Fetching sports agency listing: {}", self.listing_url);

        let response = self.http_client.get(self.listing_url.clone()).send().await?;
        let response = ensure_success(response)?;
        let bytes = response.bytes().await?;
        let html = decode_html(&bytes);

        let records = parse_listing(&html, &self.listing_url, cutoff);

        info!(
            "Sports agency listing: {} records (last {} days)",
            records.len(),
            days_back
        );
        Ok(records)
    }
}

#[async_trait]
impl BidSource for SportsAgencyClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<BidRecord>> {
        self.fetch(request.days_back).await
    }

    fn source_type(&self) -> SourceType {
        SourceType::SportsAgency
    }

    fn base_url(&self) -> &str {
        self.listing_url.as_str()
    }
}

/// Decode a page body, detecting the encoding from the content itself.
///
/// Order: byte-order mark, `<meta charset>` in the head, valid UTF-8,
/// then Shift_JIS as the usual legacy encoding of Japanese sites.
pub fn decode_html(bytes: &[u8]) -> String {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_with_bom_removal(bytes);
        return text.into_owned();
    }

    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(2048)]);
    let declared = META_CHARSET_RE
        .captures(&head)
        .and_then(|caps| Encoding::for_label(caps[1].as_bytes()));

    let encoding = match declared {
        Some(encoding) => encoding,
        None if std::str::from_utf8(bytes).is_ok() => UTF_8,
        None => SHIFT_JIS,
    };
    debug!("Decoding listing page as {}", encoding.name());

    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        warn!("Listing page contained bytes invalid for {}", encoding.name());
    }
    text.into_owned()
}

/// Extract records from the listing page.
///
/// The page is a sequence of `<dt>` date labels each followed by a `<dd>`
/// holding one link. Entries dated on or before `cutoff`, without a parseable date,
/// or missing the `<dd>`/link are skipped. Links resolve against `page_url`.
pub fn parse_listing(html: &str, page_url: &Url, cutoff: NaiveDate) -> Vec<BidRecord> {
    let document = Html::parse_document(html);
    let mut records = Vec::new();

    for dt in document.select(&DT_SELECTOR) {
        let label: String = dt.text().collect();
        let date = match parse_era_date(&label) {
            Ok(Some(date)) => date,
            Ok(None) => continue,
            Err(e) => {
                warn!("Skipping listing entry '{}': {}", label.trim(), e);
                continue;
            }
        };
        if date <= cutoff {
            continue;
        }

        let Some(dd) = dt.next_siblings().find_map(ElementRef::wrap) else {
            continue;
        };
        if dd.value().name() != "dd" {
            continue;
        }

        let Some(link) = dd.select(&LINK_SELECTOR).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href").map(str::trim) else {
            continue;
        };

        let url = match page_url.join(href) {
            Ok(url) => url.to_string(),
            Err(e) => {
                warn!("Skipping listing link '{}': {}", href, e);
                continue;
            }
        };
        let title: String = link.text().map(str::trim).collect();

        records.push(BidRecord {
            id: extract_id(href),
            title,
            organization: ORGANIZATION.to_string(),
            prefecture: PREFECTURE.to_string(),
            city: String::new(),
            category: CATEGORY.to_string(),
            cft_issue_date: date.format("%Y-%m-%d").to_string(),
            url,
        });
    }

    records
}

/// Identifier from a link: the `jsa_NNNNN` code when present, else the last
/// path segment without its `.htm`/`.html` extension
pub fn extract_id(href: &str) -> String {
    if let Some(m) = JSA_ID_RE.find(href) {
        return m.as_str().to_string();
    }

    let segment = href.trim_end_matches('/').rsplit('/').next().unwrap_or(href);
    segment
        .strip_suffix(".html")
        .or_else(|| segment.strip_suffix(".htm"))
        .unwrap_or(segment)
        .to_string()
}
