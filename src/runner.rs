//! One collection run: search every keyword, drop already-seen ids, notify,
//! and persist the sent-id store.

use log::{error, info, warn};
use serde::Serialize;
use std::collections::HashSet;

use crate::api::client::BidSource;
use crate::api::{BidRecord, FallbackSearch, SearchRequest, SourceFactory, SourceType};
use crate::config::Settings;
use crate::error::Result;
use crate::notify::{format_message, Notifier, SlackNotifier};
use crate::store::SentIdStore;

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub keywords_searched: usize,
    pub keyword_failures: usize,
    pub fallbacks_used: usize,
    pub records_fetched: usize,
    pub new_records: usize,
    pub notified: usize,
    pub delivery_failures: usize,
}

pub struct Runner {
    keywords: Vec<String>,
    days_back: u32,
    search: FallbackSearch,
    scraper: Option<Box<dyn BidSource>>,
    notifier: Option<Box<dyn Notifier>>,
}

impl Runner {
    pub fn new(
        keywords: Vec<String>,
        days_back: u32,
        search: FallbackSearch,
        scraper: Option<Box<dyn BidSource>>,
        notifier: Option<Box<dyn Notifier>>,
    ) -> Self {
        Self {
            keywords,
            days_back,
            search,
            scraper,
            notifier,
        }
    }

    /// Wire up the production sources and Slack.
    ///
    /// With `dry_run` no notifier is built, so no token is needed.
    pub fn from_settings(settings: &Settings, dry_run: bool, scrape: bool) -> Result<Self> {
        let search = FallbackSearch::new(
            SourceFactory::create(SourceType::Mcp, settings)?,
            SourceFactory::create(SourceType::Kkj, settings)?,
        );

        let scraper = if scrape && settings.sports_agency.enabled {
            Some(SourceFactory::create(SourceType::SportsAgency, settings)?)
        } else {
            None
        };

        let notifier: Option<Box<dyn Notifier>> = if dry_run {
            None
        } else {
            Some(Box::new(SlackNotifier::from_settings(settings)?))
        };

        Ok(Self::new(
            settings.keywords(),
            settings.search.days_back,
            search,
            scraper,
            notifier,
        ))
    }

    pub fn is_dry_run(&self) -> bool {
        self.notifier.is_none()
    }

    /// Run every keyword, notify new records and save `store` once.
    ///
    /// In dry-run mode messages go to stdout and the store is left untouched.
    pub async fn run(&self, store: &mut SentIdStore) -> Result<RunSummary> {
        info!("Starting bid collection ({} keywords)", self.keywords.len());

        let mut summary = RunSummary::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut new_records: Vec<BidRecord> = Vec::new();

        for keyword in &self.keywords {
            summary.keywords_searched += 1;
            let request = SearchRequest::new(keyword.clone(), self.days_back);

            let outcome = match self.search.search(&request).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Search failed keyword={}: {}", keyword, e);
                    summary.keyword_failures += 1;
                    continue;
                }
            };
            if outcome.used_fallback() {
                summary.fallbacks_used += 1;
            }

            let records = outcome.into_records();
            info!("keyword={}: {} records", keyword, records.len());
            summary.records_fetched += records.len();
            collect_new(records, store, &mut seen, &mut new_records);
        }

        if let Some(scraper) = &self.scraper {
            match scraper.search(&SearchRequest::lookback(self.days_back)).await {
                Ok(records) => {
                    info!("{}: {} records", scraper.source_type().display_name(), records.len());
                    summary.records_fetched += records.len();
                    collect_new(records, store, &mut seen, &mut new_records);
                }
                Err(e) => warn!("{} failed: {}", scraper.source_type().display_name(), e),
            }
        }

        summary.new_records = new_records.len();
        info!("New records: {} (after deduplication)", new_records.len());

        let Some(notifier) = &self.notifier else {
            for record in &new_records {
                println!("{}\n", format_message(record));
            }
            info!("Dry run: {} messages printed, store not updated", new_records.len());
            return Ok(summary);
        };

        for record in &new_records {
            let text = format_message(record);
            match notifier.post(&text, None).await {
                Ok(response) if response.ok => {
                    store.insert(record.id.clone());
                    summary.notified += 1;
                }
                Ok(response) => {
                    error!(
                        "Notification rejected id={}: {}",
                        record.id,
                        response.error.as_deref().unwrap_or("unknown error")
                    );
                    summary.delivery_failures += 1;
                }
                Err(e) => {
                    error!("Notification failed id={}: {}", record.id, e);
                    summary.delivery_failures += 1;
                }
            }
        }

        store.save()?;
        info!("Done: sent {} new notifications", summary.notified);
        Ok(summary)
    }
}

/// Append records whose id is neither stored nor already seen this run
fn collect_new(
    records: Vec<BidRecord>,
    store: &SentIdStore,
    seen: &mut HashSet<String>,
    new_records: &mut Vec<BidRecord>,
) {
    for record in records {
        if record.id.is_empty() || store.contains(&record.id) {
            continue;
        }
        if seen.insert(record.id.clone()) {
            new_records.push(record);
        }
    }
}
