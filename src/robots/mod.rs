//! Robots.txt policy gate
//!
//! This module fetches robots.txt for the seed origin once per crawl and makes
//! an advisory allow/deny decision. Unreachable or non-success robots.txt
//! fails open.

mod parser;

pub use parser::{agent_token, has_blanket_disallow};

use crate::url::robots_url;
use crate::HarvestError;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Default timeout for the robots.txt request
pub const ROBOTS_TIMEOUT: Duration = Duration::from_secs(15);

/// Outcome of the policy gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDecision {
    /// Whether crawling may proceed
    pub allowed: bool,

    /// Human-readable explanation
    pub reason: String,
}

impl PolicyDecision {
    pub fn allowed(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
        }
    }

    pub fn disallowed(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }
}

/// Advisory robots.txt check for one origin
#[derive(Debug, Clone)]
pub struct PolicyGate {
    client: Client,
}

impl PolicyGate {
    /// Creates a gate whose robots.txt request is bounded by `timeout`
    pub fn new(timeout: Duration) -> Result<Self, HarvestError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()?;
        Ok(Self { client })
    }

    /// Fetches robots.txt for `url`'s origin and decides whether `user_agent` may crawl
    ///
    /// # Returns
    ///
    /// Always a decision; fetch failures and non-success statuses yield
    /// `allowed = true` with the failure recorded in `reason`.
    pub async fn check(&self, url: &Url, user_agent: &str) -> PolicyDecision {
        let endpoint = robots_url(url);
        tracing::debug!("Fetching robots.txt: {}", endpoint);

        let mut request = self.client.get(endpoint.as_str());
        if !user_agent.trim().is_empty() {
            request = request.header(reqwest::header::USER_AGENT, user_agent);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("robots.txt unreachable at {}: {}", endpoint, e);
                return PolicyDecision::allowed(format!("robots.txt could not be fetched: {}", e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("robots.txt at {} returned HTTP {}", endpoint, status);
            return PolicyDecision::allowed(format!(
                "robots.txt not available (HTTP {})",
                status.as_u16()
            ));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Failed to read robots.txt body at {}: {}", endpoint, e);
                return PolicyDecision::allowed(format!("robots.txt could not be read: {}", e));
            }
        };

        let decision = if has_blanket_disallow(&body, user_agent) {
            PolicyDecision::disallowed("Disallow: / for user-agent")
        } else {
            PolicyDecision::allowed("allowed")
        };

        tracing::info!(
            "robots.txt for {}: {} ({})",
            url.origin().ascii_serialization(),
            if decision.allowed { "allowed" } else { "disallowed" },
            decision.reason
        );
        decision
    }
}

/// One-shot policy check with the default timeout
pub async fn check_policy(url: &Url, user_agent: &str) -> Result<PolicyDecision, HarvestError> {
    let gate = PolicyGate::new(ROBOTS_TIMEOUT)?;
    Ok(gate.check(url, user_agent).await)
}
