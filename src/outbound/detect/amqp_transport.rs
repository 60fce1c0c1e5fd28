//! Lapin-backed broker-RPC detection transport.
//!
//! One JSON request per image is published to the detection work queue with
//! RabbitMQ direct reply-to; a background task consumes the pseudo-queue and
//! routes replies back to waiting calls by correlation id. All images of a
//! batch are in flight concurrently, and one missing reply fails the whole
//! call; callers treat a batch as atomic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::StreamExt;
use futures_util::future::try_join_all;
use lapin::options::{BasicConsumeOptions, BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer};
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

use super::dto::{DetectRequestDto, DetectResponseDto};
use crate::domain::detection::DetectionBatch;
use crate::domain::ports::{DetectionTransport, DetectionTransportError};

/// RabbitMQ pseudo-queue for direct reply-to RPC.
const DIRECT_REPLY_TO_QUEUE: &str = "amq.rabbitmq.reply-to";

/// Routes reply payloads to the call that registered the correlation id.
///
/// Entries are removed on dispatch, on timeout and on channel closure, so a
/// late reply for an abandoned call is discarded rather than leaked.
#[derive(Default)]
pub(crate) struct ReplyRouter {
    pending: Mutex<HashMap<String, oneshot::Sender<Vec<u8>>>>,
}

impl ReplyRouter {
    /// Register interest in a correlation id.
    pub(crate) fn register(&self, correlation_id: String) -> oneshot::Receiver<Vec<u8>> {
        let (sender, receiver) = oneshot::channel();
        self.pending
            .lock()
            .expect("reply router lock poisoned")
            .insert(correlation_id, sender);
        receiver
    }

    /// Deliver a reply; returns false when no call is waiting for it.
    pub(crate) fn dispatch(&self, correlation_id: &str, payload: Vec<u8>) -> bool {
        let sender = self
            .pending
            .lock()
            .expect("reply router lock poisoned")
            .remove(correlation_id);
        match sender {
            Some(sender) => sender.send(payload).is_ok(),
            None => false,
        }
    }

    /// Drop a registration whose call gave up waiting.
    pub(crate) fn forget(&self, correlation_id: &str) {
        self.pending
            .lock()
            .expect("reply router lock poisoned")
            .remove(correlation_id);
    }
}

/// Broker-RPC adapter over a long-lived channel shared by all in-flight
/// workflow calls.
pub struct AmqpDetectionTransport {
    channel: Channel,
    queue: String,
    reply_timeout: Duration,
    router: Arc<ReplyRouter>,
}

impl AmqpDetectionTransport {
    /// Connect to the broker, declare the work queue and start the reply
    /// consumer.
    ///
    /// # Errors
    ///
    /// Returns a connection error when the broker is unreachable or the
    /// channel cannot be set up.
    pub async fn connect(
        url: &str,
        queue: impl Into<String>,
        reply_timeout: Duration,
    ) -> Result<Self, DetectionTransportError> {
        let queue = queue.into();
        let connection = Connection::connect(url, ConnectionProperties::default())
            .await
            .map_err(map_amqp_error)?;
        let channel = connection.create_channel().await.map_err(map_amqp_error)?;
        channel
            .queue_declare(&queue, QueueDeclareOptions::default(), FieldTable::default())
            .await
            .map_err(map_amqp_error)?;

        let consumer = channel
            .basic_consume(
                DIRECT_REPLY_TO_QUEUE,
                "detect-reply",
                BasicConsumeOptions {
                    no_ack: true,
                    ..BasicConsumeOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(map_amqp_error)?;

        let router = Arc::new(ReplyRouter::default());
        tokio::spawn(route_replies(consumer, Arc::clone(&router)));

        Ok(Self {
            channel,
            queue,
            reply_timeout,
            router,
        })
    }

    async fn detect_one(&self, image: &[u8]) -> Result<DetectionBatch, DetectionTransportError> {
        let correlation_id = Uuid::new_v4().to_string();
        let receiver = self.router.register(correlation_id.clone());

        let payload = serde_json::to_vec(&DetectRequestDto {
            image_bytes: BASE64.encode(image),
        })
        .map_err(|err| DetectionTransportError::decode(err.to_string()))?;

        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_correlation_id(correlation_id.as_str().into())
            .with_reply_to(DIRECT_REPLY_TO_QUEUE.into());

        let publish = self
            .channel
            .basic_publish(
                "",
                &self.queue,
                BasicPublishOptions::default(),
                &payload,
                properties,
            )
            .await
            .map_err(map_amqp_error)?;
        publish.await.map_err(map_amqp_error)?;

        let reply = match tokio::time::timeout(self.reply_timeout, receiver).await {
            Ok(Ok(payload)) => payload,
            Ok(Err(_)) => {
                self.router.forget(&correlation_id);
                return Err(DetectionTransportError::connection(
                    "reply consumer stopped before a reply arrived",
                ));
            }
            Err(_) => {
                self.router.forget(&correlation_id);
                return Err(DetectionTransportError::timeout(format!(
                    "no reply within {}s",
                    self.reply_timeout.as_secs()
                )));
            }
        };

        let dto: DetectResponseDto = serde_json::from_slice(&reply)
            .map_err(|err| DetectionTransportError::decode(err.to_string()))?;
        dto.into_domain().map_err(DetectionTransportError::decode)
    }
}

async fn route_replies(mut consumer: Consumer, router: Arc<ReplyRouter>) {
    while let Some(delivery) = consumer.next().await {
        match delivery {
            Ok(delivery) => {
                let Some(correlation_id) = delivery
                    .properties
                    .correlation_id()
                    .as_ref()
                    .map(ToString::to_string)
                else {
                    warn!("detection reply without correlation id discarded");
                    continue;
                };
                if !router.dispatch(&correlation_id, delivery.data) {
                    debug!(%correlation_id, "late detection reply discarded");
                }
            }
            Err(err) => {
                warn!(error = %err, "detection reply consumer error");
            }
        }
    }
    debug!("detection reply consumer stopped");
}

fn map_amqp_error(error: lapin::Error) -> DetectionTransportError {
    DetectionTransportError::connection(error.to_string())
}

#[async_trait]
impl DetectionTransport for AmqpDetectionTransport {
    async fn recognize(
        &self,
        images: &[Vec<u8>],
    ) -> Result<Vec<DetectionBatch>, DetectionTransportError> {
        try_join_all(images.iter().map(|image| self.detect_one(image))).await
    }
}
