use crate::config::types::{
    Config, CrawlerConfig, HttpConfig, OutputConfig, ProxyConfig, RetryConfig,
};
use crate::ConfigError;
use url::Url;

/// Proxy schemes the transport can route through
const PROXY_SCHEMES: &[&str] = &["http", "https", "socks5", "socks5h"];

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_http_config(&config.http)?;
    validate_retry_config(&config.retry)?;
    validate_proxy_config(&config.proxy)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawl loop limits
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.detail_concurrency < 1 || config.detail_concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "detail_concurrency must be between 1 and 100, got {}",
            config.detail_concurrency
        )));
    }

    Ok(())
}

/// Validates admission control settings
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.jitter_min_ms > config.jitter_max_ms {
        return Err(ConfigError::Validation(format!(
            "jitter_min_ms ({}) must not exceed jitter_max_ms ({})",
            config.jitter_min_ms, config.jitter_max_ms
        )));
    }

    if config.connect_timeout_secs == 0 || config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "HTTP timeouts must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

/// Validates the retry policy
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.min_wait_ms > config.max_wait_ms {
        return Err(ConfigError::Validation(format!(
            "min_wait_ms ({}) must not exceed max_wait_ms ({})",
            config.min_wait_ms, config.max_wait_ms
        )));
    }

    for code in &config.transient_status_codes {
        if !(100..=599).contains(code) {
            return Err(ConfigError::Validation(format!(
                "transient status code {} is not a valid HTTP status",
                code
            )));
        }
    }

    Ok(())
}

/// Validates every proxy URL up front
///
/// A proxy the transport cannot route through must fail here, before any
/// request slot is handed out.
fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    for proxy in &config.proxies {
        let url = Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy URL: {}", e)))?;

        if !PROXY_SCHEMES.contains(&url.scheme()) {
            return Err(ConfigError::InvalidUrl(format!(
                "Unsupported proxy scheme '{}'",
                url.scheme()
            )));
        }

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(
                "Proxy URL is missing a host".to_string(),
            ));
        }

        reqwest::Proxy::all(proxy.as_str())
            .map_err(|e| ConfigError::InvalidUrl(format!("Proxy rejected by transport: {}", e)))?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
