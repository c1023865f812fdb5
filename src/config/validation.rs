use crate::config::types::{CrawlConfig, FetchConfig, HarvestConfig};
use crate::url::parse_seed_url;
use crate::ConfigError;
use reqwest::header::{HeaderName, HeaderValue};
use scraper::Selector;

/// Largest accepted `max-pages` value
pub const MAX_PAGES_LIMIT: u32 = 100;

/// Validates the entire configuration
pub fn validate(config: &HarvestConfig) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_fetch_config(&config.fetch)?;
    if let Some(selector) = config.selector() {
        validate_selector(selector)?;
    }
    Ok(())
}

/// Validates crawl loop configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    parse_seed_url(&config.seed_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed-url {}", e)))?;

    if config.max_pages < 1 || config.max_pages > MAX_PAGES_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max-pages must be between 1 and {}, got {}",
            MAX_PAGES_LIMIT, config.max_pages
        )));
    }

    Ok(())
}

/// Validates fetcher configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if HeaderValue::from_str(&config.user_agent).is_err() {
        return Err(ConfigError::Validation(format!(
            "user-agent contains characters not allowed in an HTTP header: '{}'",
            config.user_agent
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    for (name, value) in &config.headers {
        HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            ConfigError::Validation(format!("Invalid header name: '{}'", name))
        })?;
        HeaderValue::from_str(value).map_err(|_| {
            ConfigError::Validation(format!("Invalid value for header '{}'", name))
        })?;
    }

    Ok(())
}

/// Validates that a selector parses as CSS
fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::Validation(format!("Invalid selector '{}': {:?}", selector, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> HarvestConfig {
        HarvestConfig::from_seed("https://books.toscrape.com/")
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_max_pages_bounds() {
        let mut config = valid_config();
        config.crawl.max_pages = 0;
        assert!(validate(&config).is_err());

        config.crawl.max_pages = 101;
        assert!(validate(&config).is_err());

        config.crawl.max_pages = 100;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_seed_url() {
        let mut config = valid_config();
        config.crawl.seed_url = "ftp://example.com/".to_string();
        assert!(matches!(
            validate(&config).unwrap_err(),
            ConfigError::InvalidUrl(_)
        ));
    }

    #[test]
    fn test_empty_user_agent() {
        let mut config = valid_config();
        config.fetch.user_agent = "   ".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = valid_config();
        config.fetch.timeout_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_selector() {
        let mut config = valid_config();
        config.crawl.selector = Some("div[".to_string());
        assert!(validate(&config).is_err());

        config.crawl.selector = Some("article.product_pod h3 a".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_blank_selector_is_ignored() {
        let mut config = valid_config();
        config.crawl.selector = Some("   ".to_string());
        assert!(validate(&config).is_ok());
        assert_eq!(config.selector(), None);
    }

    #[test]
    fn test_invalid_header() {
        let mut config = valid_config();
        config
            .fetch
            .headers
            .insert("Bad Header".to_string(), "x".to_string());
        assert!(validate(&config).is_err());

        let mut config = valid_config();
        config
            .fetch
            .headers
            .insert("Accept-Language".to_string(), "id-ID,id;q=0.9".to_string());
        assert!(validate(&config).is_ok());
    }
}
