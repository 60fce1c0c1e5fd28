//! Port for evidence blob storage and presigned retrieval.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by blob store adapters.
    pub enum BlobStoreError {
        /// Backend rejected or failed the upload.
        Upload { message: String } =>
            "blob upload failed: {message}",
        /// Presigned URL generation failed.
        Sign { message: String } =>
            "blob presign failed: {message}",
    }
}

/// Port for writing evidence images and issuing bounded-lifetime links.
///
/// Keys are caller-chosen and never reused, so uploads never overwrite prior
/// evidence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key`.
    async fn upload(&self, key: &str, bytes: Vec<u8>) -> Result<(), BlobStoreError>;

    /// Issue a presigned GET URL for `key`, valid for the configured TTL.
    async fn presign(&self, key: &str) -> Result<String, BlobStoreError>;
}
