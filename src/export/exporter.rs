//! CSV serialization and upload of finalized batches

use crate::clock::Clock;
use crate::config::StorageConfig;
use crate::export::store::ObjectStore;
use crate::record::{EnrichedRecord, RecordBatch};
use crate::ExportError;
use std::path::PathBuf;
use std::sync::Arc;

/// A batch that reached object storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Remote key, `<prefix><unix timestamp>.csv`
    pub key: String,

    /// Data rows written, excluding the header
    pub rows: usize,

    /// Size of the uploaded file
    pub bytes: usize,

    /// Set when the local copy could not be written and the batch went up from memory
    pub local_copy_error: Option<String>,
}

/// Serializes batches to CSV and hands them to an [`ObjectStore`]
pub struct BatchExporter<S> {
    store: S,
    clock: Arc<dyn Clock>,
    config: StorageConfig,
}

impl<S: ObjectStore> BatchExporter<S> {
    pub fn new(config: StorageConfig, store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Remote key for a batch exported now
    pub fn next_key(&self) -> String {
        format!("{}{}.csv", self.config.key_prefix, self.clock.now().timestamp())
    }

    /// Exports a finalized batch
    ///
    /// The CSV is written to the local directory first and removed only after
    /// the store confirms the upload. A failed upload leaves it in place so the
    /// data can be recovered by hand. If the local write itself fails, the
    /// batch is still uploaded from memory.
    ///
    /// # Returns
    ///
    /// * `Ok(ExportArtifact)` - The batch is stored remotely
    /// * `Err(ExportError::EmptyBatch)` - Nothing was written or uploaded
    /// * `Err(ExportError::Upload)` - The store refused the file; the local copy is kept
    /// * `Err(ExportError::Unsaved)` - Neither the local write nor the upload succeeded
    pub async fn export(&self, batch: &RecordBatch) -> Result<ExportArtifact, ExportError> {
        if batch.is_empty() {
            return Err(ExportError::EmptyBatch);
        }

        let key = self.next_key();
        let bytes = serialize_records(batch.records())?;
        let local_path = self.config.local_dir.join(&key);

        let local_copy = match tokio::fs::write(&local_path, &bytes).await {
            Ok(()) => {
                tracing::debug!(
                    "Wrote {} records to {}",
                    batch.len(),
                    local_path.display()
                );
                Ok(local_path)
            }
            Err(e) => {
                tracing::warn!(
                    "Could not write local copy {}, uploading from memory: {}",
                    local_path.display(),
                    e
                );
                Err(e.to_string())
            }
        };

        let size = bytes.len();
        if let Err(e) = self
            .store
            .upload(&key, bytes, &self.config.content_type)
            .await
        {
            return Err(match local_copy {
                Ok(path) => ExportError::Upload {
                    key,
                    path,
                    cause: e.to_string(),
                },
                Err(write) => ExportError::Unsaved {
                    key,
                    write,
                    cause: e.to_string(),
                },
            });
        }

        tracing::info!("Uploaded {} records as {}", batch.len(), key);
        let local_copy_error = match local_copy {
            Ok(path) => {
                self.discard_local(path).await;
                None
            }
            Err(write) => Some(write),
        };

        Ok(ExportArtifact {
            key,
            rows: batch.len(),
            bytes: size,
            local_copy_error,
        })
    }

    async fn discard_local(&self, path: PathBuf) {
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!(
                "Uploaded but could not remove local file {}: {}",
                path.display(),
                e
            );
        }
    }
}

/// Serializes records as CSV, header row first, columns in field declaration order
pub fn serialize_records(records: &[EnrichedRecord]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}
