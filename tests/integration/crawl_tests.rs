//! Integration tests for the harvester
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! policy → fetch → extract → paginate cycle end-to-end with the static
//! fetcher. Rendered-fetch failure handling uses a scripted fetcher.

use async_trait::async_trait;
use std::fs::File;
use sumi_harvest::config::{FetchStrategy, HarvestConfig};
use sumi_harvest::crawler::{
    error_placeholder, FetchRequest, FetchResult, PageFetcher,
};
use sumi_harvest::output::{read_csv_table, write_csv_file, SOURCE_URL_FIELD};
use sumi_harvest::{harvest, Coordinator, CrawlData, HarvestError, PolicyDecision, StopReason};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a static-fetch test configuration for the given seed
fn create_test_config(seed_url: &str, max_pages: u32) -> HarvestConfig {
    let mut config = HarvestConfig::from_seed(seed_url);
    config.crawl.max_pages = max_pages;
    config.crawl.delay_ms = 0;
    config.fetch.strategy = FetchStrategy::Static;
    config.fetch.user_agent = "TestBot/1.0".to_string();
    config.fetch.timeout_secs = 5;
    config
}

async fn mount_page(server: &MockServer, page: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_two_pages_and_export() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: *\nDisallow: /admin\n").await;
    mount_page(
        &server,
        "/quotes/1",
        r#"<html><body>
            <div class="quote"><span class="text">Be yourself.</span></div>
            <div class="quote"><span class="text">Stay hungry.</span></div>
            <li class="next"><a href="/quotes/2">Next →</a></li>
        </body></html>"#,
    )
    .await;
    mount_page(
        &server,
        "/quotes/2",
        r#"<html><body>
            <div class="quote"><span class="text">Less is more.</span></div>
        </body></html>"#,
    )
    .await;

    let mut config = create_test_config(&format!("{}/quotes/1", base), 5);
    config.crawl.selector = Some("span.text".to_string());

    let result = harvest(config).await.unwrap();

    assert!(result.policy.allowed);
    assert_eq!(result.stop_reason, StopReason::PaginationExhausted);
    assert_eq!(result.pages_fetched, 2);

    let table = match &result.data {
        CrawlData::Table(table) => table.clone(),
        other => panic!("expected merged table, got {:?}", other),
    };
    assert_eq!(table.columns, vec![SOURCE_URL_FIELD, "text"]);
    assert_eq!(table.row_count(), 3);
    assert_eq!(table.cell(2, "text"), Some("Less is more."));
    assert_eq!(
        table.cell(2, SOURCE_URL_FIELD).map(str::to_string),
        Some(format!("{}/quotes/2", base))
    );

    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("scraped_data.csv");
    write_csv_file(&table, &csv_path).unwrap();

    let reread = read_csv_table(File::open(&csv_path).unwrap()).unwrap();
    assert_eq!(reread.row_count(), table.row_count());
    assert_eq!(reread.column_set(), table.column_set());
}

#[tokio::test]
async fn test_robots_disallow_blocks_all_fetches() {
    let server = MockServer::start().await;

    mount_robots(&server, "User-agent: *\nDisallow: /\n").await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>secret</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&format!("{}/page", server.uri()), 3);
    let result = harvest(config).await.unwrap();

    assert!(!result.policy.allowed);
    assert_eq!(result.policy.reason, "Disallow: / for user-agent");
    assert_eq!(result.stop_reason, StopReason::PolicyBlocked);
    assert_eq!(result.pages_fetched, 0);
    assert!(result.data.is_empty());
}

#[tokio::test]
async fn test_robots_disallow_for_named_agent() {
    let server = MockServer::start().await;

    mount_robots(&server, "User-agent: testbot\nDisallow: /\n").await;
    mount_page(&server, "/", "<p>home</p>").await;

    let config = create_test_config(&format!("{}/", server.uri()), 3);
    let result = harvest(config).await.unwrap();

    assert_eq!(result.stop_reason, StopReason::PolicyBlocked);
}

#[tokio::test]
async fn test_missing_robots_fails_open() {
    let server = MockServer::start().await;

    // No robots.txt mock: wiremock answers 404
    mount_page(&server, "/", "<h1>Welcome</h1><p>Hello there</p>").await;

    let config = create_test_config(&format!("{}/", server.uri()), 3);
    let result = harvest(config).await.unwrap();

    assert!(result.policy.allowed);
    assert!(result.policy.reason.contains("404"));
    assert_eq!(result.pages_fetched, 1);
    assert_eq!(result.data.record_count(), 2);
}

#[tokio::test]
async fn test_transport_error_aborts_crawl() {
    let server = MockServer::start().await;

    mount_page(&server, "/p1", r#"<p>one</p><a href="/p2">Next</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/p2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = create_test_config(&format!("{}/p1", server.uri()), 5);
    let err = harvest(config).await.unwrap_err();

    assert!(matches!(err, HarvestError::Transport { .. }));
}

#[tokio::test]
async fn test_max_pages_limits_requests() {
    let server = MockServer::start().await;

    for page in 1..=4 {
        mount_page(
            &server,
            &format!("/list/{}", page),
            &format!(r#"<p>item {}</p><a href="/list/{}">Older</a>"#, page, page + 1),
        )
        .await;
    }

    let config = create_test_config(&format!("{}/list/1", server.uri()), 2);
    let result = harvest(config).await.unwrap();

    assert_eq!(result.stop_reason, StopReason::MaxPagesReached);
    assert_eq!(result.pages_fetched, 2);

    let requests = server.received_requests().await.unwrap();
    let page_requests = requests
        .iter()
        .filter(|r| r.url.path().starts_with("/list/"))
        .count();
    assert_eq!(page_requests, 2);
}

#[tokio::test]
async fn test_table_pages_are_merged() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/t1",
        r#"<table><tr><th>Name</th><th>Price</th></tr><tr><td>Tea</td><td>3</td></tr></table>
           <a href="/t2">Berikutnya</a>"#,
    )
    .await;
    mount_page(
        &server,
        "/t2",
        r#"<table><tr><th>Name</th><th>Price</th></tr><tr><td>Coffee</td><td>4</td></tr></table>"#,
    )
    .await;

    let config = create_test_config(&format!("{}/t1", server.uri()), 5);
    let result = harvest(config).await.unwrap();

    match result.data {
        CrawlData::Table(table) => {
            assert_eq!(table.row_count(), 2);
            assert_eq!(table.cell(1, "Name"), Some("Coffee"));
        }
        other => panic!("expected merged table, got {:?}", other),
    }
}

#[tokio::test]
async fn test_preflight_detects_challenge_page() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<html><body><div class="g-recaptcha" data-sitekey="k"></div></body></html>"#,
    )
    .await;

    let config = create_test_config(&format!("{}/", server.uri()), 3);
    let mut coordinator = Coordinator::new(config).unwrap();
    let preflight = coordinator.preflight().await.unwrap();

    assert!(preflight.policy.allowed);
    assert!(preflight.challenge_detected);

    let result = coordinator.run().await.unwrap();
    assert_eq!(result.stop_reason, StopReason::ChallengeDetected);
    assert!(result.data.is_empty());

    // robots.txt is fetched once even though the seed page is fetched twice
    let requests = server.received_requests().await.unwrap();
    let robots_requests = requests
        .iter()
        .filter(|r| r.url.path() == "/robots.txt")
        .count();
    assert_eq!(robots_requests, 1);
}

/// Simulates a rendered fetch that always fails
struct FailingRenderer;

#[async_trait]
impl PageFetcher for FailingRenderer {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, HarvestError> {
        let description = "navigation timed out".to_string();
        Ok(FetchResult {
            url: request.url.to_string(),
            markup: error_placeholder(&description),
            error: Some(description),
        })
    }
}

#[tokio::test]
async fn test_rendered_failure_placeholder_is_extracted() {
    let config = create_test_config("http://x/p1", 3);
    let mut coordinator = Coordinator::with_fetcher(config, Box::new(FailingRenderer))
        .unwrap()
        .with_policy_decision(PolicyDecision::allowed("allowed"));

    let result = coordinator.run().await.unwrap();

    assert_eq!(result.stop_reason, StopReason::PaginationExhausted);
    assert_eq!(result.pages_fetched, 1);

    let table = result.data.to_export_table();
    assert_eq!(table.cell(0, "type"), Some("h1"));
    assert_eq!(
        table.cell(0, "content"),
        Some("Error with rendered fetch: navigation timed out")
    );
}
