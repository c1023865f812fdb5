use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Desktop browser user agent used when none is configured
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Main configuration structure for Sumi-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawl loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// First page to fetch
    #[serde(rename = "seed-url")]
    pub seed_url: String,

    /// Upper bound on fetched pages (1-100)
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Politeness pause between pages (milliseconds)
    #[serde(rename = "delay-ms", default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Whether to look for a "next page" link after each page
    #[serde(rename = "follow-pagination", default = "default_true")]
    pub follow_pagination: bool,

    /// Optional CSS selector; empty or absent means automatic extraction
    #[serde(default)]
    pub selector: Option<String>,
}

/// How pages are fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchStrategy {
    /// Plain HTTP GET, no JavaScript
    Static,
    /// Headless browser, JavaScript executed
    Rendered,
}

/// Load signal the rendered strategy waits for before capturing the DOM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderWait {
    /// The page `load` event
    Load,
    /// `load` plus a quiet period with no new network resources
    NetworkIdle,
}

/// Fetcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_strategy")]
    pub strategy: FetchStrategy,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Run the browser without a window (rendered strategy only)
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(rename = "render-wait", default = "default_render_wait")]
    pub render_wait: RenderWait,

    /// Extra request headers (static strategy)
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Where to write the CSV export, if anywhere
    #[serde(rename = "csv-path", default)]
    pub csv_path: Option<String>,
}

fn default_max_pages() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

fn default_strategy() -> FetchStrategy {
    FetchStrategy::Rendered
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_render_wait() -> RenderWait {
    RenderWait::NetworkIdle
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            user_agent: default_user_agent(),
            headless: true,
            timeout_secs: default_timeout_secs(),
            render_wait: default_render_wait(),
            headers: BTreeMap::new(),
        }
    }
}

impl HarvestConfig {
    /// Builds a configuration with defaults for everything except the seed URL
    pub fn from_seed(seed_url: impl Into<String>) -> Self {
        Self {
            crawl: CrawlConfig {
                seed_url: seed_url.into(),
                max_pages: default_max_pages(),
                delay_ms: default_delay_ms(),
                follow_pagination: true,
                selector: None,
            },
            fetch: FetchConfig::default(),
            output: OutputConfig::default(),
        }
    }

    /// The selector to use, treating blank strings as "none"
    pub fn selector(&self) -> Option<&str> {
        self.crawl
            .selector
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.crawl.delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_secs)
    }
}
