//! Crawler module for the listing → detail pipeline
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching of listing and detail documents
//! - The per-cycle crawl orchestration
//! - The run scheduler repeating crawl and export

mod coordinator;
mod fetcher;
mod scheduler;

pub use coordinator::{Coordinator, CrawlReport, Termination};
pub use fetcher::{build_http_client, fetch_url, Document, HttpFetcher, PageFetcher};
pub use scheduler::{CycleSummary, ExportStatus, RunScheduler};
