use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    pub schedule: ScheduleConfig,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Listing index URL, without the page parameter
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Fixed query parameters appended to every listing request (fuel, sort order)
    #[serde(default)]
    pub filters: BTreeMap<String, String>,

    /// Name of the pagination query parameter
    #[serde(rename = "page-param", default = "default_page_param")]
    pub page_param: String,

    /// Maximum number of records collected per cycle
    #[serde(rename = "target-count")]
    pub target_count: usize,

    /// Pause between listing page fetches (milliseconds)
    #[serde(rename = "page-delay-ms", default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Pause between detail page fetches (milliseconds)
    #[serde(rename = "detail-delay-ms", default)]
    pub detail_delay_ms: u64,

    /// Timeout for a single document request (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Substring identifying the horsepower entry on detail pages
    #[serde(rename = "power-marker", default = "default_power_marker")]
    pub power_marker: String,
}

/// Identity sent with every outbound request
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Full User-Agent header value
    pub value: String,
}

/// Object storage target for exported batches
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Base URL of the storage service
    pub endpoint: String,

    /// Bucket receiving the batches
    pub bucket: String,

    /// Logical name prefix of every object key
    #[serde(rename = "key-prefix")]
    pub key_prefix: String,

    /// Environment variable holding the service key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    #[serde(rename = "content-type", default = "default_content_type")]
    pub content_type: String,

    /// Directory for the temporary CSV artifact
    #[serde(rename = "local-dir", default = "default_local_dir")]
    pub local_dir: PathBuf,
}

/// Run scheduling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Wait between two crawl cycles (seconds)
    #[serde(rename = "interval-secs")]
    pub interval_secs: u64,
}

fn default_page_param() -> String {
    "p".to_string()
}

fn default_page_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_power_marker() -> String {
    "cv".to_string()
}

fn default_content_type() -> String {
    "text/csv".to_string()
}

fn default_local_dir() -> PathBuf {
    PathBuf::from(".")
}
