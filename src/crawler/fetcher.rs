//! Page fetching strategies
//!
//! This module defines the fetch capability the coordinator depends on and
//! the static (plain HTTP) implementation. The rendered implementation lives
//! in `browser.rs`.
//!
//! The two strategies fail differently:
//! - Static: non-2xx or network failure is a `HarvestError::Transport`
//! - Rendered: failures come back as placeholder markup with `error` set

use crate::config::{FetchStrategy, HarvestConfig, RenderWait};
use crate::crawler::browser::RenderedFetcher;
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// Everything needed for one fetch attempt
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: Url,
    pub strategy: FetchStrategy,
    pub headers: BTreeMap<String, String>,
    pub user_agent: String,
    pub render_wait: RenderWait,
    pub timeout: Duration,
    pub headless: bool,
}

impl FetchRequest {
    /// Builds a request for `url` using the fetch settings from `config`
    pub fn from_config(config: &HarvestConfig, url: Url) -> Self {
        Self {
            url,
            strategy: config.fetch.strategy,
            headers: config.fetch.headers.clone(),
            user_agent: config.fetch.user_agent.clone(),
            render_wait: config.fetch.render_wait,
            timeout: config.timeout(),
            headless: config.fetch.headless,
        }
    }
}

/// Markup returned by a fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    /// The requested URL
    pub url: String,

    /// Raw or rendered HTML; may be an error placeholder
    pub markup: String,

    /// Set when `markup` is a placeholder describing a failure
    pub error: Option<String>,
}

impl FetchResult {
    pub fn ok(url: impl Into<String>, markup: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            markup: markup.into(),
            error: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.error.is_some()
    }
}

/// Capability to turn a URL into markup
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches one page
    ///
    /// # Returns
    ///
    /// * `Ok(FetchResult)` - Markup (possibly a placeholder, see `FetchResult::error`)
    /// * `Err(HarvestError)` - A failure that must abort the crawl
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, HarvestError>;
}

/// Builds the HTTP client shared by static fetches
///
/// Timeouts and the user agent are applied per request.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Plain HTTP GET fetcher
#[derive(Debug, Clone)]
pub struct StaticFetcher {
    client: Client,
}

impl StaticFetcher {
    pub fn new() -> Result<Self, HarvestError> {
        Ok(Self::with_client(build_http_client()?))
    }

    /// Uses a caller-configured client, e.g. one with proxies or default headers
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, HarvestError> {
        let url = request.url.as_str();

        let mut builder = self.client.get(url).timeout(request.timeout);
        if !request
            .headers
            .keys()
            .any(|k| k.eq_ignore_ascii_case(USER_AGENT.as_str()))
        {
            builder = builder.header(USER_AGENT, request.user_agent.as_str());
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let transport = |source: reqwest::Error| HarvestError::Transport {
            url: url.to_string(),
            source,
        };

        let response = builder
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;

        let status = response.status();
        let markup = response.text().await.map_err(transport)?;
        tracing::debug!("GET {} -> {} ({} bytes)", url, status, markup.len());

        Ok(FetchResult::ok(url, markup))
    }
}

/// Returns the fetcher implementation for a strategy
pub fn fetcher_for(strategy: FetchStrategy) -> Result<Box<dyn PageFetcher>, HarvestError> {
    Ok(match strategy {
        FetchStrategy::Static => Box::new(StaticFetcher::new()?),
        FetchStrategy::Rendered => Box::new(RenderedFetcher::new()),
    })
}
