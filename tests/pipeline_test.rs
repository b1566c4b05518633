use chrono::{Datelike, Local};
use mockito::{Matcher, Mock, Server, ServerGuard};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::Path;

use bidwatch::api::client::{BidSource, ClientConfig};
use bidwatch::api::kkj::KkjClient;
use bidwatch::api::mcp::McpClient;
use bidwatch::api::sports_agency::SportsAgencyClient;
use bidwatch::api::FallbackSearch;
use bidwatch::notify::{Notifier, SlackNotifier};
use bidwatch::runner::Runner;
use bidwatch::store::SentIdStore;

const SLACK_PATH: &str = "/api/chat.postMessage";

/// Event-stream body as returned by the MCP server for `items` of (Key, ProjectName)
fn mcp_body(items: &[(&str, &str)]) -> String {
    let results: Vec<_> = items
        .iter()
        .map(|(key, name)| {
            json!({
                "Key": key,
                "ProjectName": name,
                "OrganizationName": "テスト市",
                "PrefectureName": "東京都",
                "CityName": "千代田区",
                "Category": "役務",
                "CftIssueDate": "2024-04-01T00:00:00+09:00",
                "ExternalDocumentURI": format!("https://example.jp/{}", key),
            })
        })
        .collect();
    let text = json!({"SearchHits": results.len(), "SearchResult": results}).to_string();
    let envelope = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": {"content": [{"type": "text", "text": text}]},
    });
    format!("event: message\ndata: {}\n\n", envelope)
}

fn kkj_body(items: &[(&str, &str)]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?><Results><SearchResults>");
    for (key, name) in items {
        xml.push_str(&format!(
            "<SearchResult><Key>{}</Key><ProjectName>{}</ProjectName><OrganizationName>テスト県</OrganizationName></SearchResult>",
            key, name
        ));
    }
    xml.push_str("</SearchResults></Results>");
    xml
}

async fn mock_mcp(server: &mut ServerGuard, keyword: &str, items: &[(&str, &str)]) -> Mock {
    server
        .mock("POST", "/mcp")
        .match_body(Matcher::PartialJson(
            json!({"params": {"arguments": {"query": keyword}}}),
        ))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(mcp_body(items))
        .create_async()
        .await
}

async fn mock_slack_ok(server: &mut ServerGuard) -> Mock {
    server
        .mock("POST", SLACK_PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok": true, "channel": "C123", "ts": "1.0"}"#)
        .create_async()
        .await
}

fn runner(
    server: &ServerGuard,
    keywords: &[&str],
    scraper: Option<Box<dyn BidSource>>,
    dry_run: bool,
) -> Runner {
    let config = ClientConfig::with_timeout(5);
    let primary =
        McpClient::new(format!("{}/mcp", server.url()), "kkj-search", 50, config.clone()).unwrap();
    let secondary = KkjClient::new(format!("{}/api/", server.url()), 50, config.clone()).unwrap();

    let notifier: Option<Box<dyn Notifier>> = if dry_run {
        None
    } else {
        let slack_url = format!("{}{}", server.url(), SLACK_PATH);
        Some(Box::new(
            SlackNotifier::new(slack_url, "xoxb-test", "C123", config).unwrap(),
        ))
    };

    Runner::new(
        keywords.iter().map(|k| k.to_string()).collect(),
        7,
        FallbackSearch::new(Box::new(primary), Box::new(secondary)),
        scraper,
        notifier,
    )
}

fn stored_ids(path: &Path) -> Vec<String> {
    SentIdStore::load(path).ids().map(str::to_string).collect()
}

#[tokio::test]
async fn test_mcp_failure_falls_back_to_kkj_once() {
    let mut server = Server::new_async().await;
    let mcp = server
        .mock("POST", "/mcp")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;
    let kkj = server
        .mock("GET", "/api/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("Query".into(), "体育館".into()),
            Matcher::UrlEncoded("Count".into(), "50".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/xml")
        .with_body(kkj_body(&[("K1", "体育館清掃業務")]))
        .expect(1)
        .create_async()
        .await;
    let slack = server
        .mock("POST", SLACK_PATH)
        .match_body(Matcher::Regex("体育館清掃業務".into()))
        .with_body(r#"{"ok": true}"#)
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sent_ids.json");
    let mut store = SentIdStore::load(&path);

    let summary = runner(&server, &["体育館"], None, false)
        .run(&mut store)
        .await
        .unwrap();

    mcp.assert_async().await;
    kkj.assert_async().await;
    slack.assert_async().await;
    assert_eq!(summary.fallbacks_used, 1);
    assert_eq!(summary.notified, 1);
    assert_eq!(stored_ids(&path), vec!["K1"]);
}

#[tokio::test]
async fn test_mcp_tool_error_falls_back() {
    let mut server = Server::new_async().await;
    let envelope = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": {"content": [{"type": "text", "text": "rate limited"}], "isError": true},
    });
    let _mcp = server
        .mock("POST", "/mcp")
        .with_body(format!("data: {}\n\n", envelope))
        .create_async()
        .await;
    let kkj = server
        .mock("GET", "/api/")
        .match_query(Matcher::Any)
        .with_body(kkj_body(&[("K2", "プール管理")]))
        .expect(1)
        .create_async()
        .await;
    let _slack = mock_slack_ok(&mut server).await;

    let dir = tempfile::tempdir().unwrap();
    let mut store = SentIdStore::load(dir.path().join("sent_ids.json"));
    let summary = runner(&server, &["プール"], None, false)
        .run(&mut store)
        .await
        .unwrap();

    kkj.assert_async().await;
    assert_eq!(summary.fallbacks_used, 1);
    assert!(store.contains("K2"));
}

#[tokio::test]
async fn test_malformed_fallback_xml_counts_as_answered() {
    let mut server = Server::new_async().await;
    let mcp = server
        .mock("POST", "/mcp")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;
    let kkj = server
        .mock("GET", "/api/")
        .match_query(Matcher::UrlEncoded("Query".into(), "BMX".into()))
        .with_header("content-type", "application/xml")
        .with_body("<r><item><Key>K1</Title></item></r>")
        .expect(1)
        .create_async()
        .await;
    let slack = server
        .mock("POST", SLACK_PATH)
        .expect(0)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sent_ids.json");
    let mut store = SentIdStore::load(&path);

    let summary = runner(&server, &["BMX"], None, false)
        .run(&mut store)
        .await
        .unwrap();

    mcp.assert_async().await;
    kkj.assert_async().await;
    slack.assert_async().await;
    assert_eq!(summary.fallbacks_used, 1);
    assert_eq!(summary.keyword_failures, 0);
    assert_eq!(summary.records_fetched, 0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_duplicates_across_keywords_are_sent_once() {
    let mut server = Server::new_async().await;
    let _a = mock_mcp(&mut server, "体育館", &[("X1", "総合体育館指定管理")]).await;
    let _b = mock_mcp(
        &mut server,
        "指定管理",
        &[("X1", "総合体育館指定管理"), ("X2", "公園指定管理")],
    )
    .await;
    let slack = server
        .mock("POST", SLACK_PATH)
        .with_body(r#"{"ok": true}"#)
        .expect(2)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sent_ids.json");
    let mut store = SentIdStore::load(&path);

    let summary = runner(&server, &["体育館", "指定管理"], None, false)
        .run(&mut store)
        .await
        .unwrap();

    slack.assert_async().await;
    assert_eq!(summary.records_fetched, 3);
    assert_eq!(summary.new_records, 2);
    assert_eq!(summary.fallbacks_used, 0);
    assert_eq!(stored_ids(&path), vec!["X1", "X2"]);
}

#[tokio::test]
async fn test_second_run_sends_nothing() {
    let mut server = Server::new_async().await;
    let _mcp = mock_mcp(&mut server, "スポーツ", &[("S1", "スポーツ教室運営")]).await;
    let slack = server
        .mock("POST", SLACK_PATH)
        .with_body(r#"{"ok": true}"#)
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sent_ids.json");

    let first = {
        let mut store = SentIdStore::load(&path);
        runner(&server, &["スポーツ"], None, false)
            .run(&mut store)
            .await
            .unwrap()
    };
    let second = {
        let mut store = SentIdStore::load(&path);
        runner(&server, &["スポーツ"], None, false)
            .run(&mut store)
            .await
            .unwrap()
    };

    slack.assert_async().await;
    assert_eq!(first.notified, 1);
    assert_eq!(second.records_fetched, 1);
    assert_eq!(second.new_records, 0);
    assert_eq!(second.notified, 0);
    assert_eq!(stored_ids(&path), vec!["S1"]);
}

#[tokio::test]
async fn test_records_without_key_are_never_sent() {
    let mut server = Server::new_async().await;
    let _mcp = mock_mcp(&mut server, "施設管理", &[("", "キーなし案件"), ("F1", "施設管理業務")]).await;
    let slack = server
        .mock("POST", SLACK_PATH)
        .match_body(Matcher::Regex("施設管理業務".into()))
        .with_body(r#"{"ok": true}"#)
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut store = SentIdStore::load(dir.path().join("sent_ids.json"));
    let summary = runner(&server, &["施設管理"], None, false)
        .run(&mut store)
        .await
        .unwrap();

    slack.assert_async().await;
    assert_eq!(summary.new_records, 1);
    assert_eq!(store.ids().collect::<Vec<_>>(), vec!["F1"]);
}

#[tokio::test]
async fn test_failed_delivery_is_not_stored() {
    let mut server = Server::new_async().await;
    let _mcp = mock_mcp(&mut server, "運動", &[("A1", "運動場整備"), ("B2", "運動会委託")]).await;
    let _ok = server
        .mock("POST", SLACK_PATH)
        .match_body(Matcher::Regex("運動場整備".into()))
        .with_body(r#"{"ok": true}"#)
        .create_async()
        .await;
    let _rejected = server
        .mock("POST", SLACK_PATH)
        .match_body(Matcher::Regex("運動会委託".into()))
        .with_body(r#"{"ok": false, "error": "channel_not_found"}"#)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sent_ids.json");
    let mut store = SentIdStore::load(&path);

    let summary = runner(&server, &["運動"], None, false)
        .run(&mut store)
        .await
        .unwrap();

    assert_eq!(summary.notified, 1);
    assert_eq!(summary.delivery_failures, 1);
    assert_eq!(stored_ids(&path), vec!["A1"]);
}

#[tokio::test]
async fn test_keyword_failure_does_not_stop_run() {
    let mut server = Server::new_async().await;
    let _down = server
        .mock("POST", "/mcp")
        .match_body(Matcher::PartialJson(
            json!({"params": {"arguments": {"query": "体育"}}}),
        ))
        .with_status(503)
        .create_async()
        .await;
    let _kkj_down = server
        .mock("GET", "/api/")
        .match_query(Matcher::UrlEncoded("Query".into(), "体育".into()))
        .with_status(503)
        .create_async()
        .await;
    let _mcp = mock_mcp(&mut server, "運営", &[("R1", "大会運営")]).await;
    let _slack = mock_slack_ok(&mut server).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sent_ids.json");
    let mut store = SentIdStore::load(&path);

    let summary = runner(&server, &["体育", "運営"], None, false)
        .run(&mut store)
        .await
        .unwrap();

    assert_eq!(summary.keywords_searched, 2);
    assert_eq!(summary.keyword_failures, 1);
    assert_eq!(stored_ids(&path), vec!["R1"]);
}

#[tokio::test]
async fn test_dry_run_leaves_store_untouched() {
    let mut server = Server::new_async().await;
    let _mcp = mock_mcp(&mut server, "体育館", &[("D1", "体育館改修")]).await;
    let slack = server
        .mock("POST", SLACK_PATH)
        .expect(0)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sent_ids.json");
    let mut store = SentIdStore::load(&path);

    let runner = runner(&server, &["体育館"], None, true);
    assert!(runner.is_dry_run());
    let summary = runner.run(&mut store).await.unwrap();

    slack.assert_async().await;
    assert_eq!(summary.new_records, 1);
    assert_eq!(summary.notified, 0);
    assert!(!path.exists());
}

#[tokio::test]
async fn test_listing_scrape_joins_the_run() {
    let mut server = Server::new_async().await;
    let _mcp = mock_mcp(&mut server, "スポーツ", &[]).await;

    let today = Local::now().date_naive();
    let html = format!(
        r#"<html><head><meta charset="utf-8"></head><body><dl>
<dt>令和{}年{}月{}日</dt>
<dd><a href="detail/jsa_00123.htm">地域スポーツ振興事業の公募</a></dd>
<dt>令和2年1月1日</dt>
<dd><a href="detail/jsa_00001.htm">古い公募</a></dd>
</dl></body></html>"#,
        today.year() - 2018,
        today.month(),
        today.day()
    );
    let _listing = server
        .mock("GET", "/sports/b_menu/boshu/index.htm")
        .with_header("content-type", "text/html")
        .with_body(html)
        .create_async()
        .await;
    let slack = server
        .mock("POST", SLACK_PATH)
        .match_body(Matcher::Regex("地域スポーツ振興事業の公募".into()))
        .with_body(r#"{"ok": true}"#)
        .expect(1)
        .create_async()
        .await;

    let scraper = SportsAgencyClient::new(
        &format!("{}/sports/b_menu/boshu/index.htm", server.url()),
        ClientConfig::with_timeout(5),
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sent_ids.json");
    let mut store = SentIdStore::load(&path);

    let summary = runner(&server, &["スポーツ"], Some(Box::new(scraper)), false)
        .run(&mut store)
        .await
        .unwrap();

    slack.assert_async().await;
    assert_eq!(summary.notified, 1);
    assert_eq!(stored_ids(&path), vec!["jsa_00123"]);
}
