//! Driven adapters: detection transports, persistence and blob storage.

pub mod detect;
pub mod persistence;
pub mod storage;
