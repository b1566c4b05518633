use async_trait::async_trait;
use chrono::Local;
use log::{error, info, warn};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;

use super::client::ClientConfig;
use super::http_client::{create_client, ensure_success};
use super::normalize::{kkj_field, BidField, RawBid};
use super::types::{BidRecord, SearchRequest};
use super::{BidSource, SourceType};
use crate::config::Settings;
use crate::error::{BidwatchError, Result};

/// Element names that wrap one announcement
const RECORD_TAGS: [&str; 2] = ["item", "SearchResult"];

/// Direct client for the KKJ (官公需情報ポータルサイト) XML API
pub struct KkjClient {
    api_url: String,
    max_results: u32,
    http_client: Client,
}

impl KkjClient {
    pub fn new(api_url: impl Into<String>, max_results: u32, config: ClientConfig) -> Result<Self> {
        Ok(Self {
            api_url: api_url.into(),
            max_results,
            http_client: create_client(&config)?,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.kkj.api_url.clone(),
            settings.search.max_results_per_query,
            ClientConfig::with_timeout(settings.kkj.timeout_secs),
        )
    }

    /// Request URL with `Query`, `Count` and `CFT_Issue_Date` parameters
    pub fn build_url(&self, request: &SearchRequest) -> Result<reqwest::Url> {
        let count = request.count.unwrap_or(self.max_results);
        let params = [
            ("Query", request.keyword.clone()),
            ("Count", count.to_string()),
            ("CFT_Issue_Date", request.date_range(Local::now().date_naive())?),
        ];

        reqwest::Url::parse_with_params(&self.api_url, &params)
            .map_err(|e| BidwatchError::InvalidInput(format!("Invalid KKJ API URL: {}", e)))
    }
}

#[async_trait]
impl BidSource for KkjClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<BidRecord>> {
        info!("KKJ API search: keyword={}", request.keyword);

        let url = self.build_url(request)?;
        let response = self.http_client.get(url).send().await?;
        let response = ensure_success(response)?;
        let body = response.text().await?;

        // A broken document costs this keyword its results, nothing more.
        let records = match parse_search_results(&body) {
            Ok(records) => records,
            Err(e) => {
                error!("KKJ API returned malformed XML (keyword={}): {}", request.keyword, e);
                return Ok(Vec::new());
            }
        };

        info!("KKJ API search: {} records (keyword={})", records.len(), request.keyword);
        Ok(records)
    }

    fn source_type(&self) -> SourceType {
        SourceType::Kkj
    }

    fn base_url(&self) -> &str {
        &self.api_url
    }
}

/// Parse a KKJ XML document into canonical records.
///
/// Every `<item>` / `<SearchResult>` element is one record; its child tags are
/// mapped through the KKJ tag table. Blocks without a `Key` are dropped.
pub fn parse_search_results(xml: &str) -> Result<Vec<BidRecord>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut records = Vec::new();
    let mut current: Option<RawBid> = None;
    let mut field: Option<BidField> = None;
    let mut dropped = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| xml_error(&reader, e))?;

        match event {
            Event::Start(e) => {
                let name = tag_name(e.local_name().as_ref());
                if current.is_none() {
                    if RECORD_TAGS.contains(&name.as_str()) {
                        current = Some(RawBid::default());
                    }
                } else {
                    field = kkj_field(&name);
                }
            }
            Event::Text(t) => {
                if let (Some(raw), Some(f)) = (current.as_mut(), field) {
                    let text = t.unescape().map_err(|e| xml_error(&reader, e))?;
                    raw.push(f, &text);
                }
            }
            Event::CData(c) => {
                if let (Some(raw), Some(f)) = (current.as_mut(), field) {
                    raw.push(f, &String::from_utf8_lossy(&c));
                }
            }
            Event::End(e) => {
                let name = tag_name(e.local_name().as_ref());
                if current.is_some() && RECORD_TAGS.contains(&name.as_str()) {
                    match current.take().and_then(RawBid::into_record) {
                        Some(record) => records.push(record),
                        None => dropped += 1,
                    }
                }
                field = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if current.is_some() {
        return Err(BidwatchError::Parse("KKJ XML ended inside a record".to_string()));
    }
    if dropped > 0 {
        warn!("KKJ API: dropped {} records without Key", dropped);
    }

    Ok(records)
}

fn tag_name(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn xml_error(reader: &Reader<&[u8]>, e: quick_xml::Error) -> BidwatchError {
    BidwatchError::Parse(format!(
        "XML error at byte {}: {}",
        reader.buffer_position(),
        e
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_item_scenario() {
        let xml = "<Results><item><Key>K9</Key><ProjectName>Foo</ProjectName></item></Results>";
        let records = parse_search_results(xml).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "K9");
        assert_eq!(records[0].title, "Foo");
        assert_eq!(records[0].organization, "不明");
    }

    #[test]
    fn test_native_search_result_blocks() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<Results>
  <Version>1.0</Version>
  <SearchResults>
    <SearchHits>2</SearchHits>
    <SearchResult>
      <ResultId>1</ResultId>
      <Key>AAA</Key>
      <ExternalDocumentURI>https://example.jp/a</ExternalDocumentURI>
      <ProjectName>運動公園 &amp; 体育館 清掃業務</ProjectName>
      <OrganizationName>札幌市</OrganizationName>
      <PrefectureName>北海道</PrefectureName>
      <CityName>札幌市</CityName>
      <Category>役務</Category>
      <CftIssueDate>2024-04-02T00:00:00+09:00</CftIssueDate>
      <Attachments><Attachment><Name>仕様書.pdf</Name></Attachment></Attachments>
    </SearchResult>
    <SearchResult>
      <ResultId>2</ResultId>
      <Key><![CDATA[BBB]]></Key>
      <ProjectName>スケートボード場設計</ProjectName>
    </SearchResult>
  </SearchResults>
</Results>"#;

        let records = parse_search_results(xml).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "AAA");
        assert_eq!(records[0].title, "運動公園 & 体育館 清掃業務");
        assert_eq!(records[0].prefecture, "北海道");
        assert_eq!(records[0].cft_issue_date, "2024-04-02");
        assert_eq!(records[0].url, "https://example.jp/a");
        assert_eq!(records[1].id, "BBB");
        assert_eq!(records[1].category, "不明");
    }

    #[test]
    fn test_items_without_key_are_dropped() {
        let xml = "<r><item><ProjectName>x</ProjectName></item><item><Key>K1</Key></item></r>";
        let records = parse_search_results(xml).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "K1");
    }

    #[test]
    fn test_malformed_xml_is_error() {
        let xml = "<r><item><Key>K1</Title></item></r>";
        assert!(matches!(parse_search_results(xml), Err(BidwatchError::Parse(_))));
    }

    #[test]
    fn test_empty_document() {
        assert!(parse_search_results("<Results/>").unwrap().is_empty());
    }

    #[test]
    fn test_build_url() {
        let client =
            KkjClient::new("http://www.kkj.go.jp/api/", 200, ClientConfig::default()).unwrap();
        let request = SearchRequest {
            cft_issue_date: Some("2024-04-01/2024-04-08".to_string()),
            ..SearchRequest::new("BMX", 7)
        };
        let url = client.build_url(&request).unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert!(pairs.contains(&("Query".to_string(), "BMX".to_string())));
        assert!(pairs.contains(&("Count".to_string(), "200".to_string())));
        assert!(pairs.contains(&(
            "CFT_Issue_Date".to_string(),
            "2024-04-01/2024-04-08".to_string()
        )));
    }

    #[tokio::test]
    async fn test_search_swallows_malformed_xml() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/api/")
            .match_query(mockito::Matcher::UrlEncoded("Query".into(), "BMX".into()))
            .with_status(200)
            .with_header("content-type", "application/xml")
            .with_body("<r><item><Key>K1</Title></item></r>")
            .create_async()
            .await;

        let client =
            KkjClient::new(format!("{}/api/", server.url()), 200, ClientConfig::default()).unwrap();
        let records = client.search(&SearchRequest::new("BMX", 7)).await.unwrap();

        m.assert_async().await;
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_search_rejects_out_of_range_lookback() {
        let client =
            KkjClient::new("http://127.0.0.1:9/api/", 200, ClientConfig::with_timeout(1)).unwrap();
        let err = client.search(&SearchRequest::new("BMX", u32::MAX)).await.unwrap_err();
        assert!(matches!(err, BidwatchError::InvalidInput(_)));
    }
}
