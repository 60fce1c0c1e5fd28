//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod blob_store;
mod detection_transport;
mod session_store;

#[cfg(test)]
pub use blob_store::MockBlobStore;
pub use blob_store::{BlobStore, BlobStoreError};
#[cfg(test)]
pub use detection_transport::MockDetectionTransport;
pub use detection_transport::{DetectionTransport, DetectionTransportError};
#[cfg(test)]
pub use session_store::MockSessionStore;
pub use session_store::{NewLedgerEntry, SessionStore, SessionStoreError};
