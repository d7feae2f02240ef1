//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for both the listing website and the
//! object store, and drive full crawl + export cycles end-to-end.

use carros_crawler::clock::{Clock, SystemClock};
use carros_crawler::config::{CrawlerConfig, StorageConfig, UserAgentConfig};
use carros_crawler::crawler::{
    Coordinator, ExportStatus, HttpFetcher, RunScheduler, Termination,
};
use carros_crawler::export::{BatchExporter, SupabaseStore};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

fn crawler_config(base_url: &str, target_count: usize) -> CrawlerConfig {
    let mut filters = BTreeMap::new();
    filters.insert("combustivel".to_string(), "electrico".to_string());
    CrawlerConfig {
        base_url: format!("{}/carros-usados", base_url),
        filters,
        page_param: "p".to_string(),
        target_count,
        page_delay_ms: 10,
        detail_delay_ms: 0,
        request_timeout_secs: 5,
        power_marker: "cv".to_string(),
    }
}

fn storage_config(endpoint: &str, dir: &TempDir) -> StorageConfig {
    StorageConfig {
        endpoint: endpoint.to_string(),
        bucket: "carros".to_string(),
        key_prefix: "carros_eletricos_".to_string(),
        api_key_env: "SUPABASE_KEY".to_string(),
        content_type: "text/csv".to_string(),
        local_dir: dir.path().to_path_buf(),
    }
}

fn scheduler(
    site: &MockServer,
    storage: &MockServer,
    dir: &TempDir,
    target_count: usize,
) -> RunScheduler<HttpFetcher, SupabaseStore> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let user_agent = UserAgentConfig {
        value: AGENT.to_string(),
    };

    let fetcher = HttpFetcher::new(&user_agent, Duration::from_secs(5)).expect("client");
    let coordinator = Coordinator::new(
        crawler_config(&site.uri(), target_count),
        fetcher,
        clock.clone(),
    )
    .expect("coordinator");

    let store = SupabaseStore::new(reqwest::Client::new(), &storage.uri(), "carros", "secret");
    let exporter = BatchExporter::new(storage_config(&storage.uri(), dir), store, clock.clone());

    RunScheduler::new(coordinator, exporter, clock, Duration::from_secs(1))
}

fn listing_entry(base_url: &str, id: u32) -> String {
    format!(
        r#"<div class="description">
            <a itemprop="url" href="{}/anuncio/carro-{}">Carro {}</a>
            <ul class="push-bottom"><li>2020</li><li>{}.500 km</li><li>Eléctrico</li></ul>
            <div class="price"><span>€ {}.750</span></div>
        </div>"#,
        base_url, id, id, id, id
    )
}

fn detail_page(power: u32) -> String {
    format!(
        r#"<html><body>
            <div class="trader"><span class="region">Sintra</span><span class="country">Lisboa</span></div>
            <ul class="characteristics">
                <li class="gearbox"><span class="value">Automática</span></li>
            </ul>
            <ul class="vehicle-resume"><li>{} cv</li></ul>
        </body></html>"#,
        power
    )
}

async fn mount_listing(site: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/carros-usados"))
        .and(query_param("combustivel", "electrico"))
        .and(query_param("p", page))
        .and(header("user-agent", AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(site)
        .await;
}

async fn mount_detail(site: &MockServer, id: u32, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/anuncio/carro-{}", id)))
        .respond_with(response)
        .mount(site)
        .await;
}

async fn uploaded_bodies(storage: &MockServer) -> Vec<(String, String)> {
    storage
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path().starts_with("/storage/v1/object/carros/"))
        .map(|request| {
            (
                request.url.path().to_string(),
                String::from_utf8(request.body).expect("utf-8 body"),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_cycle_skips_failed_detail_and_uploads_batch() {
    let site = MockServer::start().await;
    let storage = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let entries: String = [1, 2, 3]
        .iter()
        .map(|id| listing_entry(&site.uri(), *id))
        .collect();
    mount_listing(&site, "1", format!("<html><body>{}</body></html>", entries)).await;
    mount_detail(&site, 1, ResponseTemplate::new(200).set_body_string(detail_page(110))).await;
    mount_detail(&site, 2, ResponseTemplate::new(500)).await;
    mount_detail(&site, 3, ResponseTemplate::new(200).set_body_string(detail_page(330))).await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/storage/v1/object/carros/carros_eletricos_\d+\.csv$"))
        .and(header("authorization", "Bearer secret"))
        .and(header("content-type", "text/csv"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&storage)
        .await;

    let summary = scheduler(&site, &storage, &dir, 2).run_cycle(1).await;

    assert_eq!(summary.records, 2);
    assert_eq!(summary.items_skipped, 1);
    assert!(matches!(summary.termination, Termination::TargetReached));
    assert!(matches!(summary.export, ExportStatus::Uploaded(_)));

    let uploads = uploaded_bodies(&storage).await;
    assert_eq!(uploads.len(), 1);
    let lines: Vec<&str> = uploads[0].1.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("title,detail_url,year,distance_km,fuel_type,price_eur"));
    assert!(lines[1].starts_with("Carro 1,"));
    assert!(lines[1].contains(",1500,Eléctrico,1750,\"Lisboa, Sintra\",0,110,Automática,unknown,1,"));
    assert!(lines[2].starts_with("Carro 3,"));

    // The local artifact is discarded after a confirmed upload
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_first_listing_failure_exports_nothing() {
    let site = MockServer::start().await;
    let storage = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/carros-usados"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&site)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&storage)
        .await;

    let summary = scheduler(&site, &storage, &dir, 10).run_cycle(1).await;

    assert_eq!(summary.records, 0);
    assert!(matches!(summary.termination, Termination::Aborted { page: 1, .. }));
    assert!(matches!(summary.export, ExportStatus::NothingToExport));
}

#[tokio::test]
async fn test_pagination_until_exhausted() {
    let site = MockServer::start().await;
    let storage = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(
        &site,
        "1",
        format!("<html><body>{}</body></html>", listing_entry(&site.uri(), 1)),
    )
    .await;
    mount_listing(
        &site,
        "2",
        format!("<html><body>{}</body></html>", listing_entry(&site.uri(), 2)),
    )
    .await;
    mount_listing(&site, "3", "<html><body>Sem resultados</body></html>".to_string()).await;
    mount_detail(&site, 1, ResponseTemplate::new(200).set_body_string(detail_page(1))).await;
    mount_detail(&site, 2, ResponseTemplate::new(200).set_body_string(detail_page(2))).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&storage)
        .await;

    let summary = scheduler(&site, &storage, &dir, 50).run_cycle(1).await;

    assert_eq!(summary.records, 2);
    assert_eq!(summary.pages_fetched, 3);
    assert!(matches!(summary.termination, Termination::Exhausted));
}

#[tokio::test]
async fn test_failed_upload_keeps_local_artifact() {
    let site = MockServer::start().await;
    let storage = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(
        &site,
        "1",
        format!("<html><body>{}</body></html>", listing_entry(&site.uri(), 1)),
    )
    .await;
    mount_detail(&site, 1, ResponseTemplate::new(200).set_body_string(detail_page(90))).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("storage down"))
        .mount(&storage)
        .await;

    let summary = scheduler(&site, &storage, &dir, 1).run_cycle(1).await;

    assert_eq!(summary.records, 1);
    assert!(matches!(summary.export, ExportStatus::Failed(_)));

    let kept: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(kept.len(), 1);
    let content = std::fs::read_to_string(&kept[0]).unwrap();
    assert_eq!(content.lines().count(), 2);
}
