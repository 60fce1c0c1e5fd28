//! S3-compatible blob store adapter for evidence images.
//!
//! Built on `object_store`'s AmazonS3 implementation so MinIO and AWS S3
//! deployments are interchangeable. Presigned URLs are produced locally via
//! SigV4 signing; no extra round-trip to the backend.

use std::time::Duration;

use async_trait::async_trait;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::{ObjectStore, PutPayload};

use crate::domain::ports::{BlobStore, BlobStoreError};

/// Connection settings for the evidence bucket.
#[derive(Debug, Clone)]
pub struct S3BlobStoreConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Lifetime of presigned GET links.
    pub presign_ttl: Duration,
}

/// Evidence blob store over an S3-compatible backend.
pub struct S3BlobStore {
    store: AmazonS3,
    presign_ttl: Duration,
}

impl S3BlobStore {
    /// Build the adapter from connection settings.
    ///
    /// # Errors
    ///
    /// Returns an error when the client cannot be constructed from the
    /// provided settings.
    pub fn new(config: S3BlobStoreConfig) -> Result<Self, object_store::Error> {
        let allow_http = config.endpoint.starts_with("http://");
        let store = AmazonS3Builder::new()
            .with_endpoint(&config.endpoint)
            .with_bucket_name(&config.bucket)
            .with_access_key_id(&config.access_key)
            .with_secret_access_key(&config.secret_key)
            .with_region(&config.region)
            .with_allow_http(allow_http)
            .build()?;

        Ok(Self {
            store,
            presign_ttl: config.presign_ttl,
        })
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>) -> Result<(), BlobStoreError> {
        self.store
            .put(&Path::from(key), PutPayload::from(bytes))
            .await
            .map_err(|err| BlobStoreError::upload(err.to_string()))?;
        Ok(())
    }

    async fn presign(&self, key: &str) -> Result<String, BlobStoreError> {
        let url = self
            .store
            .signed_url(Method::GET, &Path::from(key), self.presign_ttl)
            .await
            .map_err(|err| BlobStoreError::sign(err.to_string()))?;
        Ok(url.to_string())
    }
}
