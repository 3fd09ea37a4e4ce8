//! Serial consumption loop with manual acknowledgement.

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::handler::{Disposition, MessageProcessor};
use super::source::{InboundMessage, MessageSource};
use crate::error::QueueError;

/// Loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Draining,
}

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumptionStats {
    pub received: u64,
    pub acked: u64,
    pub rejected: u64,
    /// Ack or reject calls the broker did not accept
    pub settle_failures: u64,
}

/// Pulls one message at a time, hands it to the processor, then acks or rejects it.
///
/// With prefetch 1 the broker holds back message N+1 until N is settled, so
/// messages are settled in the order they were received.
pub struct ConsumptionLoop<S, P> {
    source: S,
    processor: P,
    state: LoopState,
    stats: ConsumptionStats,
}

impl<S, P> ConsumptionLoop<S, P>
where
    S: MessageSource,
    P: MessageProcessor,
{
    pub fn new(source: S, processor: P) -> Self {
        Self {
            source,
            processor,
            state: LoopState::Running,
            stats: ConsumptionStats::default(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Run until `shutdown` fires or the channel dies.
    ///
    /// Cancellation is checked between messages only; a message already being
    /// processed runs to completion. The source is closed on every exit path.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<ConsumptionStats, QueueError> {
        info!(processor = self.processor.name(), "Starting consumer loop");

        let result = self.drive(&shutdown).await;
        self.source.close().await;

        match &result {
            Ok(()) => info!(
                received = self.stats.received,
                acked = self.stats.acked,
                rejected = self.stats.rejected,
                "Consumer stopped gracefully"
            ),
            Err(e) => error!(
                error = %e,
                received = self.stats.received,
                acked = self.stats.acked,
                rejected = self.stats.rejected,
                "Consumer stopped on fatal error"
            ),
        }

        result.map(|()| self.stats)
    }

    async fn drive(&mut self, shutdown: &CancellationToken) -> Result<(), QueueError> {
        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    self.state = LoopState::Draining;
                    info!("Received shutdown signal, stopping consumer");
                    return Ok(());
                }
                next = self.source.next_message() => match next {
                    Some(Ok(message)) => self.handle(message).await,
                    Some(Err(e)) => {
                        self.state = LoopState::Draining;
                        return Err(e);
                    }
                    None => {
                        self.state = LoopState::Draining;
                        return Err(QueueError::ChannelClosed);
                    }
                },
            }
        }
    }

    /// Process one message and settle it exactly once.
    async fn handle(&mut self, message: InboundMessage) {
        self.stats.received += 1;
        let delivery_tag = message.delivery_tag;
        debug!(
            delivery_tag,
            redelivered = message.redelivered,
            bytes = message.payload.len(),
            "Message received"
        );

        let result = self.processor.process(&message.payload).await;
        let disposition = Disposition::from_result(&result);

        if let Err(e) = &result {
            error!(delivery_tag, error = %e, "Failed to process message");
        }

        let settled = match disposition {
            Disposition::Ack => message.ack().await,
            Disposition::RejectWithoutRequeue => message.reject().await,
        };

        match settled {
            Ok(()) => {
                match disposition {
                    Disposition::Ack => self.stats.acked += 1,
                    Disposition::RejectWithoutRequeue => self.stats.rejected += 1,
                }
                info!(delivery_tag, action = %disposition, "Message settled");
            }
            Err(e) => {
                self.stats.settle_failures += 1;
                warn!(
                    delivery_tag,
                    action = %disposition,
                    error = %e,
                    "Failed to settle message with broker"
                );
            }
        }
    }
}
