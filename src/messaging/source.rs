//! Message source abstraction and its RabbitMQ implementation.

use async_trait::async_trait;
use futures::StreamExt;
use lapin::{
    acker::Acker,
    message::Delivery,
    options::{BasicAckOptions, BasicNackOptions},
    Channel, Connection, Consumer,
};
use tracing::{info, warn};

use crate::error::QueueError;

/// Settles a single delivery with the broker.
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn ack(&self) -> Result<(), QueueError>;

    /// Reject without requeue.
    async fn reject(&self) -> Result<(), QueueError>;
}

#[async_trait]
impl Acknowledger for Acker {
    async fn ack(&self) -> Result<(), QueueError> {
        Acker::ack(self, BasicAckOptions::default()).await?;
        Ok(())
    }

    async fn reject(&self) -> Result<(), QueueError> {
        Acker::nack(
            self,
            BasicNackOptions {
                requeue: false,
                ..Default::default()
            },
        )
        .await?;
        Ok(())
    }
}

/// One delivered message, owned by the loop iteration that received it.
pub struct InboundMessage {
    pub delivery_tag: u64,
    pub redelivered: bool,
    pub payload: Vec<u8>,
    acker: Box<dyn Acknowledger>,
}

impl InboundMessage {
    pub fn new(
        delivery_tag: u64,
        redelivered: bool,
        payload: Vec<u8>,
        acker: Box<dyn Acknowledger>,
    ) -> Self {
        Self {
            delivery_tag,
            redelivered,
            payload,
            acker,
        }
    }

    pub async fn ack(&self) -> Result<(), QueueError> {
        self.acker.ack().await
    }

    pub async fn reject(&self) -> Result<(), QueueError> {
        self.acker.reject().await
    }
}

impl From<Delivery> for InboundMessage {
    fn from(delivery: Delivery) -> Self {
        Self::new(
            delivery.delivery_tag,
            delivery.redelivered,
            delivery.data,
            Box::new(delivery.acker),
        )
    }
}

/// A stream of messages requiring manual acknowledgement.
#[async_trait]
pub trait MessageSource: Send {
    /// The next message. `None` means the underlying channel is gone.
    ///
    /// Must be cancel-safe: dropping the future before it resolves loses nothing.
    async fn next_message(&mut self) -> Option<Result<InboundMessage, QueueError>>;

    /// Release broker resources. Errors are logged, not returned.
    async fn close(&mut self);
}

/// RabbitMQ consumer plus the channel and connection it lives on.
pub struct AmqpSource {
    connection: Connection,
    channel: Channel,
    consumer: Consumer,
}

impl AmqpSource {
    pub(crate) fn new(connection: Connection, channel: Channel, consumer: Consumer) -> Self {
        Self {
            connection,
            channel,
            consumer,
        }
    }
}

#[async_trait]
impl MessageSource for AmqpSource {
    async fn next_message(&mut self) -> Option<Result<InboundMessage, QueueError>> {
        self.consumer
            .next()
            .await
            .map(|delivery| delivery.map(InboundMessage::from).map_err(QueueError::from))
    }

    async fn close(&mut self) {
        if self.channel.status().connected() {
            if let Err(e) = self.channel.close(200, "worker shutdown").await {
                warn!(error = %e, "Failed to close channel");
            }
        }
        if self.connection.status().connected() {
            if let Err(e) = self.connection.close(200, "worker shutdown").await {
                warn!(error = %e, "Failed to close connection");
            }
        }
        info!("RabbitMQ connection closed");
    }
}
