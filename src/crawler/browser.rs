//! Rendered page fetching through a headless Chromium instance
//!
//! Every fetch launches its own browser process, navigates, waits for the
//! page to settle and captures the rendered DOM. The browser is torn down on
//! every exit path. Failures never abort the crawl: they are turned into a
//! small placeholder document so extraction sees the problem as content.

use crate::config::RenderWait;
use crate::crawler::fetcher::{FetchRequest, FetchResult, PageFetcher};
use crate::HarvestError;
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pause after navigation before the DOM is captured
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Quiet period the network-idle heuristic waits for
const IDLE_WINDOW_MS: u64 = 500;

/// Builds the markup substituted for a failed rendered fetch
pub fn error_placeholder(description: &str) -> String {
    let escaped = description
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!(
        "<html><body><h1>Error with rendered fetch: {}</h1></body></html>",
        escaped
    )
}

/// Headless browser fetcher
#[derive(Debug, Clone)]
pub struct RenderedFetcher {
    settle: Duration,

    /// Browser binary to launch; chromiumoxide searches the system when unset
    executable: Option<PathBuf>,
}

impl Default for RenderedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderedFetcher {
    pub fn new() -> Self {
        Self {
            settle: SETTLE_DELAY,
            executable: None,
        }
    }

    /// Launches the given browser binary instead of the detected one
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Launches a browser, renders the page and tears everything down
    async fn render(&self, request: &FetchRequest) -> Result<String, HarvestError> {
        let config = browser_config(request, self.executable.as_deref())?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| HarvestError::Browser(format!("failed to launch browser: {}", e)))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler event error: {}", e);
                }
            }
        });

        let outcome = tokio::time::timeout(request.timeout, self.capture(&browser, request)).await;

        if let Err(e) = browser.close().await {
            warn!("Failed to close browser: {}", e);
        }
        if let Err(e) = browser.wait().await {
            warn!("Failed to wait for browser exit: {}", e);
        }
        handler_task.abort();

        match outcome {
            Ok(result) => result,
            Err(_) => Err(HarvestError::Browser(format!(
                "navigation to {} timed out after {}s",
                request.url,
                request.timeout.as_secs()
            ))),
        }
    }

    async fn capture(&self, browser: &Browser, request: &FetchRequest) -> Result<String, HarvestError> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| HarvestError::Browser(format!("failed to open page: {}", e)))?;

        page.goto(request.url.as_str())
            .await
            .map_err(|e| HarvestError::Browser(format!("failed to navigate: {}", e)))?;

        if request.render_wait == RenderWait::NetworkIdle {
            wait_for_network_idle(&page, request.timeout / 2).await;
        }

        tokio::time::sleep(self.settle).await;

        page.content()
            .await
            .map_err(|e| HarvestError::Browser(format!("failed to read page content: {}", e)))
    }
}

#[async_trait]
impl PageFetcher for RenderedFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, HarvestError> {
        info!("Rendering {}", request.url);

        match self.render(request).await {
            Ok(markup) => {
                debug!("Rendered {} ({} bytes)", request.url, markup.len());
                Ok(FetchResult::ok(request.url.as_str(), markup))
            }
            Err(e) => {
                let description = e.to_string();
                warn!("Rendered fetch of {} failed: {}", request.url, description);
                Ok(FetchResult {
                    url: request.url.to_string(),
                    markup: error_placeholder(&description),
                    error: Some(description),
                })
            }
        }
    }
}

fn browser_config(
    request: &FetchRequest,
    executable: Option<&Path>,
) -> Result<BrowserConfig, HarvestError> {
    let mut builder = BrowserConfig::builder();
    if let Some(path) = executable {
        builder = builder.chrome_executable(path);
    }
    let builder = if request.headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };

    builder
        .request_timeout(request.timeout)
        .args(vec![
            "--disable-gpu",
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--incognito",
        ])
        .arg(format!("--user-agent={}", request.user_agent))
        .build()
        .map_err(|e| HarvestError::Browser(format!("invalid browser config: {}", e)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdleReport {
    ok: bool,
    resource_count: u64,
    waited_ms: u64,
}

/// Polls resource timing entries until no new requests appear for a while
///
/// chromiumoxide has no network-idle navigation option, so this runs inside
/// the page. Failure to reach idle is logged and otherwise ignored.
async fn wait_for_network_idle(page: &Page, timeout: Duration) {
    let timeout_ms = timeout.as_millis().min(u128::from(u64::MAX)) as u64;
    let js = format!(
        r#"(async () => {{
            const timeoutMs = {timeout_ms};
            const idleMs = {idle_ms};
            const interval = 100;
            const start = Date.now();
            const count = () => {{
                try {{ return performance.getEntriesByType('resource').length; }} catch (_) {{ return 0; }}
            }};
            let lastCount = count();
            let stableMs = 0;
            while (Date.now() - start < timeoutMs) {{
                await new Promise(r => setTimeout(r, interval));
                const curCount = count();
                if (document.readyState === 'complete' && curCount === lastCount) {{
                    stableMs += interval;
                    if (stableMs >= idleMs) {{
                        return {{ ok: true, resourceCount: curCount, waitedMs: Date.now() - start }};
                    }}
                }} else {{
                    stableMs = 0;
                }}
                lastCount = curCount;
            }}
            return {{ ok: false, resourceCount: lastCount, waitedMs: Date.now() - start }};
        }})()"#,
        timeout_ms = timeout_ms,
        idle_ms = IDLE_WINDOW_MS
    );

    match page.evaluate(js).await {
        Ok(value) => match value.into_value::<IdleReport>() {
            Ok(report) if report.ok => debug!(
                "Network idle after {}ms ({} resources)",
                report.waited_ms, report.resource_count
            ),
            Ok(report) => warn!(
                "Network did not go idle within {}ms ({} resources)",
                report.waited_ms, report.resource_count
            ),
            Err(e) => warn!("Unreadable network-idle report: {}", e),
        },
        Err(e) => warn!("Network-idle wait failed: {}", e),
    }
}
