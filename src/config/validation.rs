use crate::config::types::{Config, CrawlerConfig, ScheduleConfig, StorageConfig, UserAgentConfig};
use crate::ConfigError;
use std::path::Path;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    validate_schedule_config(&config.schedule)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_http_url("base_url", &config.base_url)?;

    if config.page_param.is_empty() {
        return Err(ConfigError::Validation(
            "page_param cannot be empty".to_string(),
        ));
    }

    if config.filters.contains_key(&config.page_param) {
        return Err(ConfigError::Validation(format!(
            "filters cannot override the page parameter '{}'",
            config.page_param
        )));
    }

    if config.target_count < 1 {
        return Err(ConfigError::Validation(format!(
            "target_count must be >= 1, got {}",
            config.target_count
        )));
    }

    if config.page_delay_ms > 60_000 || config.detail_delay_ms > 60_000 {
        return Err(ConfigError::Validation(format!(
            "politeness delays must be <= 60000ms, got page={}ms detail={}ms",
            config.page_delay_ms, config.detail_delay_ms
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if config.power_marker.trim().is_empty() {
        return Err(ConfigError::Validation(
            "power_marker cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the outbound identity header
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.value.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent value cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    validate_http_url("endpoint", &config.endpoint)?;

    if config.bucket.is_empty() {
        return Err(ConfigError::Validation("bucket cannot be empty".to_string()));
    }

    validate_key_prefix(&config.key_prefix)?;

    if config.api_key_env.is_empty() {
        return Err(ConfigError::Validation(
            "api_key_env cannot be empty".to_string(),
        ));
    }

    if config.content_type.is_empty() {
        return Err(ConfigError::Validation(
            "content_type cannot be empty".to_string(),
        ));
    }

    validate_local_dir(&config.local_dir)?;

    Ok(())
}

/// The local directory receives every batch before upload
fn validate_local_dir(dir: &Path) -> Result<(), ConfigError> {
    let metadata = std::fs::metadata(dir).map_err(|e| {
        ConfigError::Validation(format!("local_dir '{}' is not usable: {}", dir.display(), e))
    })?;

    if !metadata.is_dir() {
        return Err(ConfigError::Validation(format!(
            "local_dir '{}' is not a directory",
            dir.display()
        )));
    }

    if metadata.permissions().readonly() {
        return Err(ConfigError::Validation(format!(
            "local_dir '{}' is read-only",
            dir.display()
        )));
    }

    Ok(())
}

/// Validates schedule configuration
fn validate_schedule_config(config: &ScheduleConfig) -> Result<(), ConfigError> {
    if config.interval_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "interval_secs must be >= 1, got {}",
            config.interval_secs
        )));
    }

    Ok(())
}

/// Checks that a configured URL parses and uses an HTTP(S) scheme
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}

/// Key prefixes end up in object paths, so only a conservative character set is allowed
fn validate_key_prefix(prefix: &str) -> Result<(), ConfigError> {
    if prefix.is_empty() {
        return Err(ConfigError::Validation(
            "key_prefix cannot be empty".to_string(),
        ));
    }

    if !prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "key_prefix must contain only ASCII alphanumerics, '_' or '-', got '{}'",
            prefix
        )));
    }

    Ok(())
}
