//! Crawler coordinator - one crawl cycle from first listing page to finalized batch
//!
//! The cycle walks the listing index page by page, strictly in order:
//! - Fetch listing page `n` (failure aborts the cycle, keeping what was collected)
//! - Parse its stubs (none left means the index is exhausted)
//! - For each stub: fetch and parse the detail page, accepting or skipping the item
//! - Stop as soon as the batch reaches its target count

use crate::clock::Clock;
use crate::config::CrawlerConfig;
use crate::crawler::fetcher::PageFetcher;
use crate::parsing::{DetailParser, ListingParser};
use crate::record::{
    BatchStatus, EnrichedRecord, ItemOutcome, ItemStub, RecordBatch, SkipReason,
};
use crate::{CrawlerError, FetchError};
use scraper::Html;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Why a cycle stopped collecting
#[derive(Debug)]
pub enum Termination {
    /// A listing page yielded no stubs
    Exhausted,

    /// The batch reached its target count
    TargetReached,

    /// A listing page could not be fetched; records collected so far are kept
    Aborted { page: u32, error: FetchError },
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Exhausted => write!(f, "listing exhausted"),
            Termination::TargetReached => write!(f, "target reached"),
            Termination::Aborted { page, error } => {
                write!(f, "aborted on listing page {}: {}", page, error)
            }
        }
    }
}

/// Outcome of one crawl cycle
#[derive(Debug)]
pub struct CrawlReport {
    /// The finalized batch, possibly empty
    pub batch: RecordBatch,

    /// Listing pages fetched successfully
    pub pages_fetched: u32,

    /// Items dropped by the detail stage
    pub items_skipped: usize,

    pub termination: Termination,
}

/// Main crawl orchestrator
pub struct Coordinator<F> {
    fetcher: F,
    clock: Arc<dyn Clock>,
    listing_parser: ListingParser,
    detail_parser: DetailParser,
    base_url: Url,
    config: CrawlerConfig,
}

impl<F: PageFetcher> Coordinator<F> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `fetcher` - Source of listing and detail documents
    /// * `clock` - Used for politeness delays and record timestamps
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(CrawlerError)` - The base URL or a parser selector is invalid
    pub fn new(
        config: CrawlerConfig,
        fetcher: F,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CrawlerError> {
        Ok(Self {
            fetcher,
            clock,
            listing_parser: ListingParser::new()?,
            detail_parser: DetailParser::new(&config.power_marker)?,
            base_url: Url::parse(&config.base_url)?,
            config,
        })
    }

    /// Address of listing page `page` (1-based)
    ///
    /// Keeps any query already present on the base URL, then appends the
    /// configured filters and finally the page parameter.
    pub fn page_url(&self, page: u32) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in &self.config.filters {
                query.append_pair(key, value);
            }
            query.append_pair(&self.config.page_param, &page.to_string());
        }
        url
    }

    /// Runs one crawl cycle and returns the finalized batch
    ///
    /// Never fails: a listing fetch error ends the cycle early as
    /// [`Termination::Aborted`], and item-level failures only drop that item.
    pub async fn run_cycle(&self) -> CrawlReport {
        let mut batch = RecordBatch::new(self.config.target_count);
        let mut pages_fetched = 0;
        let mut items_skipped = 0;
        let mut details_requested = 0usize;
        let mut page = 1u32;

        let termination = loop {
            if page > 1 {
                self.pause(self.config.page_delay_ms).await;
            }

            let page_url = self.page_url(page);
            tracing::debug!("Fetching listing page {}: {}", page, page_url);

            let document = match self.fetcher.fetch(&page_url).await {
                Ok(document) => document,
                Err(error) => {
                    tracing::error!("Listing page {} failed, ending cycle: {}", page, error);
                    break Termination::Aborted { page, error };
                }
            };
            pages_fetched += 1;

            let stubs: Vec<ItemStub> = {
                let html = Html::parse_document(&document.body);
                let stubs = self.listing_parser.parse(&html, &document.url).collect();
                stubs
            };

            if stubs.is_empty() {
                tracing::info!("Listing page {} has no entries, pagination exhausted", page);
                break Termination::Exhausted;
            }

            let mut target_reached = false;
            for stub in stubs {
                if details_requested > 0 {
                    self.pause(self.config.detail_delay_ms).await;
                }
                details_requested += 1;

                match self.process_item(stub).await {
                    ItemOutcome::Accepted(record) => {
                        if batch.push(record) == BatchStatus::Full {
                            target_reached = true;
                            break;
                        }
                    }
                    ItemOutcome::Skipped(reason) => {
                        items_skipped += 1;
                        tracing::warn!("Skipping item: {}", reason);
                    }
                }
            }

            tracing::info!(
                "Page {} done: {}/{} records collected, {} items skipped",
                page,
                batch.len(),
                batch.target_count(),
                items_skipped
            );

            if target_reached {
                tracing::info!("Target of {} records reached", batch.target_count());
                break Termination::TargetReached;
            }

            page += 1;
        };

        CrawlReport {
            batch,
            pages_fetched,
            items_skipped,
            termination,
        }
    }

    /// Enriches one stub from its detail page
    ///
    /// Returns [`ItemOutcome::Skipped`] instead of an error so a single broken
    /// listing never costs the rest of the cycle.
    pub async fn process_item(&self, stub: ItemStub) -> ItemOutcome {
        let document = match self.fetcher.fetch(&stub.detail_url).await {
            Ok(document) => document,
            Err(error) => return ItemOutcome::Skipped(SkipReason::Fetch(error)),
        };

        if document.body.trim().is_empty() {
            return ItemOutcome::Skipped(SkipReason::EmptyDocument {
                url: stub.detail_url.to_string(),
            });
        }

        let detail = {
            let html = Html::parse_document(&document.body);
            self.detail_parser.parse(&html)
        };

        tracing::debug!("Accepted {} ({})", stub.title, stub.detail_url);
        ItemOutcome::Accepted(EnrichedRecord::new(stub, detail, self.clock.now()))
    }

    async fn pause(&self, millis: u64) {
        if millis > 0 {
            self.clock.sleep(Duration::from_millis(millis)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::crawler::fetcher::Document;
    use crate::FetchCause;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;

    const BASE: &str = "https://auto.sapo.pt/carros-usados";

    /// Serves canned bodies by URL; unknown URLs answer 404
    #[derive(Default)]
    struct StubFetcher {
        pages: HashMap<String, Result<String, u16>>,
        requests: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        fn page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), Ok(body.to_string()));
            self
        }

        fn failing(mut self, url: &str, status: u16) -> Self {
            self.pages.insert(url.to_string(), Err(status));
            self
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &Url) -> Result<Document, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            match self.pages.get(url.as_str()) {
                Some(Ok(body)) => Ok(Document {
                    url: url.clone(),
                    body: body.clone(),
                }),
                Some(Err(status)) => Err(FetchError {
                    url: url.to_string(),
                    cause: FetchCause::Status(*status),
                }),
                None => Err(FetchError {
                    url: url.to_string(),
                    cause: FetchCause::Status(404),
                }),
            }
        }
    }

    fn config(target_count: usize) -> CrawlerConfig {
        let mut filters = BTreeMap::new();
        filters.insert("combustivel".to_string(), "electrico".to_string());
        CrawlerConfig {
            base_url: BASE.to_string(),
            filters,
            page_param: "p".to_string(),
            target_count,
            page_delay_ms: 1000,
            detail_delay_ms: 0,
            request_timeout_secs: 10,
            power_marker: "cv".to_string(),
        }
    }

    fn page_url(page: u32) -> String {
        format!("{}?combustivel=electrico&p={}", BASE, page)
    }

    fn detail_url(id: u32) -> String {
        format!("https://auto.sapo.pt/anuncio/carro-{}", id)
    }

    fn listing(ids: &[u32]) -> String {
        let entries: String = ids
            .iter()
            .map(|id| {
                format!(
                    r#"<div class="description">
                        <a itemprop="url" href="{}">Carro {}</a>
                        <ul class="push-bottom"><li>2020</li><li>10.000 km</li><li>Eléctrico</li></ul>
                        <div class="price"><span>{}.000 €</span></div>
                    </div>"#,
                    detail_url(*id),
                    id,
                    id
                )
            })
            .collect();
        format!("<html><body>{}</body></html>", entries)
    }

    fn detail(power: u32) -> String {
        format!(
            r#"<html><body><ul class="vehicle-resume"><li>{} cv</li></ul></body></html>"#,
            power
        )
    }

    fn empty_listing() -> String {
        "<html><body><p>Sem resultados</p></body></html>".to_string()
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            chrono::Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        ))
    }

    fn titles(report: &CrawlReport) -> Vec<String> {
        report
            .batch
            .records()
            .iter()
            .map(|r| r.title.clone())
            .collect()
    }

    #[test]
    fn test_page_url() {
        let coordinator =
            Coordinator::new(config(5), StubFetcher::default(), clock()).unwrap();
        assert_eq!(coordinator.page_url(1).as_str(), page_url(1));
        assert_eq!(coordinator.page_url(12).as_str(), page_url(12));
    }

    #[tokio::test]
    async fn test_skips_failed_detail_and_keeps_order() {
        let fetcher = StubFetcher::default()
            .page(&page_url(1), &listing(&[1, 2, 3]))
            .page(&detail_url(1), &detail(100))
            .failing(&detail_url(2), 500)
            .page(&detail_url(3), &detail(300));

        let coordinator = Coordinator::new(config(2), fetcher, clock()).unwrap();
        let report = coordinator.run_cycle().await;

        assert_eq!(report.batch.len(), 2);
        assert_eq!(titles(&report), vec!["Carro 1", "Carro 3"]);
        assert_eq!(report.batch.records()[1].power, 300);
        assert_eq!(report.items_skipped, 1);
        assert!(matches!(report.termination, Termination::TargetReached));
    }

    #[tokio::test]
    async fn test_first_page_failure_aborts_with_empty_batch() {
        let fetcher = StubFetcher::default().failing(&page_url(1), 503);

        let coordinator = Coordinator::new(config(10), fetcher, clock()).unwrap();
        let report = coordinator.run_cycle().await;

        assert!(report.batch.is_empty());
        assert_eq!(report.pages_fetched, 0);
        match report.termination {
            Termination::Aborted { page, error } => {
                assert_eq!(page, 1);
                assert_eq!(error.cause, FetchCause::Status(503));
            }
            other => panic!("unexpected termination: {}", other),
        }
    }

    #[tokio::test]
    async fn test_later_page_failure_keeps_collected_records() {
        let fetcher = StubFetcher::default()
            .page(&page_url(1), &listing(&[1, 2]))
            .page(&detail_url(1), &detail(100))
            .page(&detail_url(2), &detail(200))
            .failing(&page_url(2), 500);

        let coordinator = Coordinator::new(config(10), fetcher, clock()).unwrap();
        let report = coordinator.run_cycle().await;

        assert_eq!(report.batch.len(), 2);
        assert_eq!(report.pages_fetched, 1);
        assert!(matches!(
            report.termination,
            Termination::Aborted { page: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_empty_page_exhausts_pagination() {
        let fetcher = StubFetcher::default()
            .page(&page_url(1), &listing(&[1]))
            .page(&detail_url(1), &detail(100))
            .page(&page_url(2), &empty_listing());

        let coordinator = Coordinator::new(config(10), fetcher, clock()).unwrap();
        let report = coordinator.run_cycle().await;

        assert_eq!(report.batch.len(), 1);
        assert_eq!(report.pages_fetched, 2);
        assert!(matches!(report.termination, Termination::Exhausted));
    }

    #[tokio::test]
    async fn test_target_stops_further_detail_fetches() {
        let fetcher = StubFetcher::default()
            .page(&page_url(1), &listing(&[1, 2, 3, 4]))
            .page(&detail_url(1), &detail(100))
            .page(&detail_url(2), &detail(200))
            .page(&detail_url(3), &detail(300))
            .page(&detail_url(4), &detail(400));

        let coordinator = Coordinator::new(config(2), fetcher, clock()).unwrap();
        let report = coordinator.run_cycle().await;

        assert_eq!(report.batch.len(), 2);
        assert_eq!(
            coordinator.fetcher.requests(),
            vec![page_url(1), detail_url(1), detail_url(2)]
        );
    }

    #[tokio::test]
    async fn test_batch_never_exceeds_target_across_pages() {
        for target in 1..=7 {
            let fetcher = StubFetcher::default()
                .page(&page_url(1), &listing(&[1, 2, 3]))
                .page(&page_url(2), &listing(&[4, 5]))
                .page(&page_url(3), &listing(&[6, 7, 8]))
                .page(&page_url(4), &empty_listing())
                .page(&detail_url(1), &detail(1))
                .failing(&detail_url(2), 500)
                .page(&detail_url(3), &detail(3))
                .page(&detail_url(4), &detail(4))
                .page(&detail_url(5), &detail(5))
                .failing(&detail_url(6), 404)
                .page(&detail_url(7), &detail(7))
                .page(&detail_url(8), &detail(8));

            let coordinator = Coordinator::new(config(target), fetcher, clock()).unwrap();
            let report = coordinator.run_cycle().await;

            assert!(report.batch.len() <= target);
            assert_eq!(report.batch.len(), target.min(6));
        }
    }

    #[tokio::test]
    async fn test_stub_without_link_never_enriched() {
        let html = format!(
            "<html><body>{}{}</body></html>",
            r#"<div class="description"><span>Sem link</span></div>"#,
            listing(&[1])
        );
        let fetcher = StubFetcher::default()
            .page(&page_url(1), &html)
            .page(&detail_url(1), &detail(100))
            .page(&page_url(2), &empty_listing());

        let coordinator = Coordinator::new(config(10), fetcher, clock()).unwrap();
        let report = coordinator.run_cycle().await;

        assert_eq!(titles(&report), vec!["Carro 1"]);
        assert_eq!(coordinator.fetcher.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_detail_body_is_skipped() {
        let fetcher = StubFetcher::default()
            .page(&page_url(1), &listing(&[1, 2]))
            .page(&detail_url(1), "   ")
            .page(&detail_url(2), &detail(200))
            .page(&page_url(2), &empty_listing());

        let coordinator = Coordinator::new(config(10), fetcher, clock()).unwrap();
        let report = coordinator.run_cycle().await;

        assert_eq!(titles(&report), vec!["Carro 2"]);
        assert_eq!(report.items_skipped, 1);
    }

    #[tokio::test]
    async fn test_politeness_delays() {
        let fetcher = StubFetcher::default()
            .page(&page_url(1), &listing(&[1, 2]))
            .page(&detail_url(1), &detail(100))
            .page(&detail_url(2), &detail(200))
            .page(&page_url(2), &empty_listing());

        let clock = clock();
        let mut cfg = config(10);
        cfg.detail_delay_ms = 250;
        let coordinator = Coordinator::new(cfg, fetcher, clock.clone()).unwrap();
        coordinator.run_cycle().await;

        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_millis(250), Duration::from_millis(1000)]
        );
    }

    #[tokio::test]
    async fn test_records_stamped_with_clock_time() {
        let fetcher = StubFetcher::default()
            .page(&page_url(1), &listing(&[9]))
            .page(&detail_url(9), &detail(90))
            .page(&page_url(2), &empty_listing());

        let coordinator = Coordinator::new(config(10), fetcher, clock()).unwrap();
        let report = coordinator.run_cycle().await;

        let record = &report.batch.records()[0];
        assert_eq!(record.extracted_at, "2024-06-01 12:00:00");
        assert_eq!(record.external_id, "9");
        assert_eq!(record.price_eur, 9000);
    }
}
