//! Port for invoking the external object-detection model.

use async_trait::async_trait;

use crate::domain::detection::DetectionBatch;

use super::define_port_error;

define_port_error! {
    /// Errors raised by detection transport adapters.
    pub enum DetectionTransportError {
        /// Broker or HTTP endpoint could not be reached.
        Connection { message: String } =>
            "detection transport connection failed: {message}",
        /// A reply did not arrive within the transport timeout.
        Timeout { message: String } =>
            "detection reply timed out: {message}",
        /// The endpoint answered with a non-success HTTP status.
        UpstreamStatus { status: u16 } =>
            "detection endpoint returned status {status}",
        /// A reply arrived but could not be decoded.
        Decode { message: String } =>
            "detection reply could not be decoded: {message}",
    }
}

/// Uniform interface to the detection provider.
///
/// Implementations are chosen once at process start (broker-RPC or
/// direct-call) and shared by all in-flight workflow calls. The result list
/// is order-preserving: `result[i]` belongs to `images[i]`. A batch is
/// atomic from the caller's perspective; if any single image cannot be
/// recognised the whole call fails.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DetectionTransport: Send + Sync {
    /// Dispatch one request per image and collect the per-image results.
    async fn recognize(
        &self,
        images: &[Vec<u8>],
    ) -> Result<Vec<DetectionBatch>, DetectionTransportError>;
}
