//! Object storage backends

use crate::config::StorageConfig;
use crate::ConfigError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by an object store upload
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage rejected upload with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Storage request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Write-only blob storage receiving exported batches
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `bytes` under `key` in a single call
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<(), StoreError>;
}

/// Supabase Storage REST backend
///
/// Uploads with `POST {endpoint}/storage/v1/object/{bucket}/{key}` and never
/// asks the service to overwrite an existing object.
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    client: Client,
    endpoint: String,
    bucket: String,
    api_key: String,
}

impl SupabaseStore {
    pub fn new(client: Client, endpoint: &str, bucket: &str, api_key: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Builds the store from configuration, reading the key from the configured variable
    ///
    /// # Returns
    ///
    /// * `Err(ConfigError::MissingEnv)` - The credential variable is unset or empty
    pub fn from_config(config: &StorageConfig, timeout: Duration) -> Result<Self, ConfigError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ConfigError::MissingEnv(config.api_key_env.clone()))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::Validation(format!("Failed to build storage client: {}", e)))?;

        Ok(Self::new(client, &config.endpoint, &config.bucket, &api_key))
    }

    /// Full address of the object `key`
    pub fn object_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.endpoint, self.bucket, key
        )
    }
}

#[async_trait]
impl ObjectStore for SupabaseStore {
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.object_url(key))
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
