//! Batch export
//!
//! This module handles:
//! - Serializing a finalized batch into a CSV artifact
//! - Uploading it to object storage under a timestamped key
//! - Discarding the local copy only once the upload is confirmed

mod exporter;
mod store;

pub use exporter::{BatchExporter, ExportArtifact};
pub use store::{ObjectStore, StoreError, SupabaseStore};
