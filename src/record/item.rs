use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

/// Sentinel for text fields missing from a detail page
pub const UNKNOWN: &str = "unknown";

/// Summary of one listing entry, before enrichment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemStub {
    pub title: String,

    /// Absolute address of the detail page
    pub detail_url: Url,

    /// Registration year as shown on the listing, "N/A" if absent
    pub year: String,

    pub distance_km: u64,

    pub fuel_type: String,

    pub price_eur: u64,
}

/// Fields scraped from a detail page. Every field always carries a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailFields {
    /// "country, region", whichever part is present, or "unknown"
    pub location: String,

    pub displacement_cc: u64,

    pub gearbox: String,

    pub segment: String,

    pub power: u64,
}

impl Default for DetailFields {
    fn default() -> Self {
        Self {
            location: UNKNOWN.to_string(),
            displacement_cc: 0,
            gearbox: UNKNOWN.to_string(),
            segment: UNKNOWN.to_string(),
            power: 0,
        }
    }
}

/// A listing stub joined with its detail page
///
/// Field order here is the column order of the exported CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedRecord {
    pub title: String,
    pub detail_url: String,
    pub year: String,
    pub distance_km: u64,
    pub fuel_type: String,
    pub price_eur: u64,
    pub location: String,
    pub displacement_cc: u64,
    pub power: u64,
    pub gearbox: String,
    pub segment: String,
    pub external_id: String,
    pub extracted_at: String,
}

impl EnrichedRecord {
    /// Joins a stub with its detail fields, stamping the acceptance time
    pub fn new(stub: ItemStub, detail: DetailFields, extracted_at: DateTime<Utc>) -> Self {
        let external_id = external_id_from_url(&stub.detail_url);

        Self {
            title: stub.title,
            detail_url: stub.detail_url.to_string(),
            year: stub.year,
            distance_km: stub.distance_km,
            fuel_type: stub.fuel_type,
            price_eur: stub.price_eur,
            location: detail.location,
            displacement_cc: detail.displacement_cc,
            power: detail.power,
            gearbox: detail.gearbox,
            segment: detail.segment,
            external_id,
            extracted_at: extracted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Derives the listing identifier from the last path segment of a detail URL
///
/// Takes the trailing run of digits of that segment (`tesla-model-3-6542187`
/// gives `6542187`), the whole segment when it ends in something else, and
/// "N/A" when the path has no segment at all.
pub fn external_id_from_url(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last());

    let Some(segment) = segment else {
        return "N/A".to_string();
    };

    let digits_start = segment
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i);

    match digits_start {
        Some(start) => segment[start..].to_string(),
        None => segment.to_string(),
    }
}
