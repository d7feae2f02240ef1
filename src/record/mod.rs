//! Record types flowing through one crawl cycle
//!
//! - `ItemStub`: summary fields scraped from a listing page
//! - `DetailFields`: enrichment scraped from a detail page
//! - `EnrichedRecord`: the two joined, the unit exported in a batch
//! - `RecordBatch`: the capped, ordered set of records owned by one cycle

mod batch;
mod item;

pub use batch::{BatchStatus, ItemOutcome, RecordBatch, SkipReason};
pub use item::{external_id_from_url, DetailFields, EnrichedRecord, ItemStub, UNKNOWN};
