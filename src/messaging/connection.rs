//! Startup connection to RabbitMQ and queue setup.

use std::future::Future;
use std::time::Duration;

use lapin::{
    options::{BasicConsumeOptions, BasicQosOptions, QueueDeclareOptions},
    types::FieldTable,
    Channel, Connection, ConnectionProperties,
};
use tracing::{info, warn};
use uuid::Uuid;

use super::source::AmqpSource;
use crate::error::QueueError;
use crate::types::QueueSettings;
use crate::PREFETCH_COUNT;

/// Run `connect` up to `max_attempts` times, sleeping `delay` between failures.
pub async fn retry_connect<T, E, F, Fut>(
    max_attempts: u32,
    delay: Duration,
    mut connect: F,
) -> Result<T, QueueError>
where
    E: std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match connect(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= max_attempts => {
                return Err(QueueError::ConnectExhausted {
                    attempts: max_attempts,
                    last_error: e.to_string(),
                });
            }
            Err(e) => {
                warn!(
                    error = %e,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "RabbitMQ not available, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Establishes the broker connection used for the whole process lifetime.
///
/// Connection retries happen here, once, at startup. A connection lost later
/// is not re-established.
pub struct ConnectionManager {
    settings: QueueSettings,
}

impl ConnectionManager {
    pub fn new(settings: QueueSettings) -> Self {
        Self { settings }
    }

    /// Connect with retry, declare the queue, set prefetch and start consuming.
    pub async fn open(&self) -> Result<AmqpSource, QueueError> {
        info!(
            uri = %self.settings.redacted_url(),
            queue = %self.settings.queue_name,
            max_attempts = self.settings.connect_max_attempts,
            "Connecting to RabbitMQ"
        );

        let url = self.settings.url.as_str();
        let connection = retry_connect(
            self.settings.connect_max_attempts,
            self.settings.connect_retry_delay,
            move |_| Connection::connect(url, ConnectionProperties::default()),
        )
        .await?;

        let channel = match self.prepare_channel(&connection).await {
            Ok(channel) => channel,
            Err(e) => {
                let _ = connection.close(200, "setup failed").await;
                return Err(e);
            }
        };

        let consumer_tag = format!("{}-{}", self.settings.consumer_tag_prefix, Uuid::new_v4());
        let consumer = match channel
            .basic_consume(
                &self.settings.queue_name,
                &consumer_tag,
                BasicConsumeOptions {
                    no_ack: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
        {
            Ok(consumer) => consumer,
            Err(e) => {
                let _ = connection.close(200, "setup failed").await;
                return Err(e.into());
            }
        };

        info!(
            queue = %self.settings.queue_name,
            consumer_tag = %consumer_tag,
            "Consumer started. Waiting for messages..."
        );

        Ok(AmqpSource::new(connection, channel, consumer))
    }

    /// Open a channel, declare the durable queue and cap unacked deliveries.
    async fn prepare_channel(&self, connection: &Connection) -> Result<Channel, QueueError> {
        let channel = connection.create_channel().await?;

        channel
            .queue_declare(
                &self.settings.queue_name,
                QueueDeclareOptions {
                    durable: true,
                    exclusive: false,
                    auto_delete: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        channel
            .basic_qos(PREFETCH_COUNT, BasicQosOptions::default())
            .await?;

        info!(
            queue = %self.settings.queue_name,
            prefetch = PREFETCH_COUNT,
            "Queue declared"
        );
        Ok(channel)
    }
}
