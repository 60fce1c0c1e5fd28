//! Detection transport adapters: broker-RPC and direct-call.

mod amqp_transport;
mod dto;
mod http_transport;

pub use amqp_transport::AmqpDetectionTransport;
pub use http_transport::HttpDetectionTransport;
