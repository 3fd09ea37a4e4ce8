//! Error types for the bridge.
//!
//! Per-message failures (`NormalizationError`, `DeliveryError`, `PipelineError`)
//! are turned into a reject decision inside the consumption loop. Only
//! `QueueError` and `ConfigError` ever reach `main`.

use thiserror::Error;

/// Invalid or unparseable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Broker-level failures. Fatal for the process.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Error originating from the underlying `lapin` library.
    #[error("RabbitMQ communication error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("could not connect to RabbitMQ after {attempts} attempts: {last_error}")]
    ConnectExhausted { attempts: u32, last_error: String },

    /// The consumer stream ended while the loop was still running.
    #[error("message channel was closed by the broker")]
    ChannelClosed,
}

/// A domain rule the observation violates. Checked in declaration order.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid location coordinates")]
    InvalidLocation,

    #[error("source is required")]
    MissingSource,

    #[error("temperature must be between -100 and 100, got {0}")]
    InvalidTemperature(f64),

    #[error("humidity must be between 0 and 100, got {0}")]
    InvalidHumidity(f64),

    #[error("timestamp is required")]
    MissingTimestamp,
}

/// Failure turning a payload into a `CanonicalReading`.
#[derive(Debug, Error)]
pub enum NormalizationError {
    #[error("failed to deserialize message: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// A single failed delivery attempt.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("downstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request to downstream failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to serialize reading: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DeliveryError {
    /// Client errors and unserializable payloads will fail identically on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            DeliveryError::Status { status, .. } => !(400..500).contains(status),
            DeliveryError::Transport(_) => true,
            DeliveryError::Serialization(_) => false,
        }
    }
}

/// Why a message was rejected. Every variant maps to reject-without-requeue.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    #[error("terminal delivery failure: {0}")]
    TerminalDelivery(DeliveryError),

    #[error("delivery failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: DeliveryError },
}
