//! Source retrieval into the per-job workspace.
//!
//! Two mutually exclusive source variants: a URL fetched over HTTP, or an
//! object key resolved against the configured bucket. Either way exactly one
//! file is written into the workspace. Failures surface immediately as
//! [`FetchError`]; retry, if any, belongs to the queue.

use crate::config::StorageConfig;
use crate::error::FetchError;
use crate::job::JobPayload;
use anyhow::Context;
use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Where a job's input document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    Url(String),
    StorageKey(String),
}

impl SourceRef {
    /// Extracts the source reference from a job payload.
    ///
    /// Returns `None` when neither field is present. The delivery contract
    /// is exactly one populated field; should both arrive, the URL wins.
    pub fn from_payload(payload: &JobPayload) -> Option<Self> {
        if let Some(url) = &payload.source {
            Some(SourceRef::Url(url.clone()))
        } else {
            payload
                .storage_key
                .as_ref()
                .map(|key| SourceRef::StorageKey(key.clone()))
        }
    }
}

/// Fetches one input document into the workspace.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, source: &SourceRef, dest: &Path) -> Result<(), FetchError>;
}

/// Read-only object storage handle, safe for concurrent use by all
/// executors.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, key: &str) -> Result<Vec<u8>, FetchError>;
}

/// S3-compatible object store (MinIO, AWS S3) over a configured endpoint.
pub struct S3ObjectStore {
    bucket: Bucket,
}

impl S3ObjectStore {
    /// Builds a store from connection settings. Path-style addressing is
    /// used so bucket names need no DNS entry on MinIO-style endpoints.
    pub fn new(config: &StorageConfig) -> anyhow::Result<Self> {
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .context("Failed to build storage credentials")?;
        let bucket = Bucket::new(&config.bucket, region, credentials)
            .context("Failed to configure storage bucket")?
            .with_path_style();

        Ok(Self { bucket })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, key: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .bucket
            .get_object(key)
            .await
            .map_err(|e| FetchError::Storage {
                bucket: self.bucket.name(),
                key: key.to_string(),
                message: e.to_string(),
            })?;

        if response.status_code() != 200 {
            return Err(FetchError::Storage {
                bucket: self.bucket.name(),
                key: key.to_string(),
                message: format!("status {}", response.status_code()),
            });
        }

        Ok(response.bytes().to_vec())
    }
}

/// Production fetcher: HTTP for URL sources, object storage for bucket keys.
///
/// Holds the shared clients; per-job state is only the destination path.
pub struct RemoteFetcher {
    http: reqwest::Client,
    store: Arc<dyn ObjectStore>,
}

impl RemoteFetcher {
    pub fn new(http: reqwest::Client, store: Arc<dyn ObjectStore>) -> Self {
        Self { http, store }
    }

    async fn fetch_url(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Http {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| FetchError::Http {
            url: url.to_string(),
            source: e,
        })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl SourceFetcher for RemoteFetcher {
    async fn fetch(&self, source: &SourceRef, dest: &Path) -> Result<(), FetchError> {
        let bytes = match source {
            SourceRef::Url(url) => {
                info!(url = %url, "Downloading source from URL");
                self.fetch_url(url).await?
            }
            SourceRef::StorageKey(key) => {
                info!(key = %key, "Downloading source from object storage");
                self.store.get_object(key).await?
            }
        };

        tokio::fs::write(dest, &bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobPayload;

    #[test]
    fn payload_without_source_fields_has_no_ref() {
        assert_eq!(SourceRef::from_payload(&JobPayload::default()), None);
    }

    #[test]
    fn url_source_is_extracted() {
        let payload = JobPayload {
            source: Some("http://x/doc.pdf".to_string()),
            ..Default::default()
        };
        assert_eq!(
            SourceRef::from_payload(&payload),
            Some(SourceRef::Url("http://x/doc.pdf".to_string()))
        );
    }

    #[test]
    fn storage_key_is_extracted() {
        let payload = JobPayload {
            storage_key: Some("scan.pdf".to_string()),
            ..Default::default()
        };
        assert_eq!(
            SourceRef::from_payload(&payload),
            Some(SourceRef::StorageKey("scan.pdf".to_string()))
        );
    }

    #[test]
    fn url_wins_when_both_fields_arrive() {
        let payload = JobPayload {
            source: Some("http://x/doc.pdf".to_string()),
            storage_key: Some("scan.pdf".to_string()),
            ..Default::default()
        };
        assert_eq!(
            SourceRef::from_payload(&payload),
            Some(SourceRef::Url("http://x/doc.pdf".to_string()))
        );
    }
}
