//! Defines the per-message processing contract used by the consumption loop.

use async_trait::async_trait;

use crate::error::PipelineError;

/// Processes one raw queue payload.
///
/// `Ok(())` acknowledges the message; any `Err` rejects it without requeue.
/// The loop knows nothing else about what happens inside.
#[async_trait]
pub trait MessageProcessor: Send + Sync {
    async fn process(&self, payload: &[u8]) -> Result<(), PipelineError>;

    /// A name for the processor, used for logging.
    fn name(&self) -> &str;
}

/// The two terminal actions for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    RejectWithoutRequeue,
}

impl Disposition {
    pub fn from_result<E>(result: &Result<(), E>) -> Self {
        match result {
            Ok(()) => Disposition::Ack,
            Err(_) => Disposition::RejectWithoutRequeue,
        }
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Disposition::Ack => write!(f, "ack"),
            Disposition::RejectWithoutRequeue => write!(f, "reject"),
        }
    }
}
