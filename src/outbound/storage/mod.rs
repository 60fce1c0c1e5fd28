//! Blob storage adapter for the evidence store port.

mod s3_blob_store;

pub use s3_blob_store::{S3BlobStore, S3BlobStoreConfig};
