//! HTTP client that forwards readings to the ingestion API.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, error, info, warn};

use crate::error::{DeliveryError, PipelineError};
use crate::types::{CanonicalReading, DeliverySettings};

/// Longest response body kept in an error.
const MAX_ERROR_BODY: usize = 512;

/// Final result of delivering one reading.
#[derive(Debug)]
pub enum DeliveryOutcome {
    /// The API answered 2xx.
    Success { status: u16, attempts: u32 },

    /// A 4xx or an unserializable payload. Never retried.
    TerminalFailure { attempts: u32, error: DeliveryError },

    /// Every attempt failed with a retryable error.
    RetryableFailure { attempts: u32, error: DeliveryError },
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryOutcome::Success { .. })
    }

    /// HTTP requests issued for this reading.
    pub fn attempts(&self) -> u32 {
        match self {
            DeliveryOutcome::Success { attempts, .. }
            | DeliveryOutcome::TerminalFailure { attempts, .. }
            | DeliveryOutcome::RetryableFailure { attempts, .. } => *attempts,
        }
    }

    /// Collapse into the pipeline's ack/reject result.
    pub fn into_result(self) -> Result<(), PipelineError> {
        match self {
            DeliveryOutcome::Success { .. } => Ok(()),
            DeliveryOutcome::TerminalFailure { error, .. } => {
                Err(PipelineError::TerminalDelivery(error))
            }
            DeliveryOutcome::RetryableFailure { attempts, error } => {
                Err(PipelineError::RetriesExhausted {
                    attempts,
                    last_error: error,
                })
            }
        }
    }
}

/// Delay before the attempt following `attempt` (1-indexed): `base * 2^(attempt-1)`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor)
}

/// Client for the weather ingestion endpoint.
///
/// Holds no per-reading state; the inner `reqwest::Client` only carries the
/// shared timeout policy.
pub struct DeliveryClient {
    client: Client,
    endpoint: String,
    max_attempts: u32,
    base_delay: Duration,
}

impl DeliveryClient {
    /// Create a new delivery client.
    pub fn new(settings: &DeliverySettings) -> Result<Self, DeliveryError> {
        let client = Client::builder().timeout(settings.request_timeout).build()?;

        Ok(Self {
            client,
            endpoint: settings.endpoint_url(),
            max_attempts: settings.max_attempts.max(1),
            base_delay: settings.base_delay,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Deliver a reading, retrying transient failures with exponential backoff.
    pub async fn deliver(&self, reading: &CanonicalReading) -> DeliveryOutcome {
        let body = match serde_json::to_vec(reading) {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "Reading could not be serialized");
                return DeliveryOutcome::TerminalFailure {
                    attempts: 0,
                    error: e.into(),
                };
            }
        };

        let mut attempt = 1;
        loop {
            match self.send_once(&body, attempt).await {
                Ok(status) => {
                    info!(
                        status,
                        attempt,
                        location = %reading.location,
                        "Reading delivered"
                    );
                    return DeliveryOutcome::Success {
                        status,
                        attempts: attempt,
                    };
                }
                Err(e) if !e.is_retryable() => {
                    error!(error = %e, attempt, "Non-recoverable delivery failure");
                    return DeliveryOutcome::TerminalFailure {
                        attempts: attempt,
                        error: e,
                    };
                }
                Err(e) => {
                    if attempt >= self.max_attempts {
                        error!(
                            error = %e,
                            attempts = attempt,
                            "All delivery attempts failed"
                        );
                        return DeliveryOutcome::RetryableFailure {
                            attempts: attempt,
                            error: e,
                        };
                    }

                    let delay = backoff_delay(self.base_delay, attempt);
                    warn!(
                        error = %e,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Delivery failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Issue a single POST and classify the status.
    async fn send_once(&self, body: &[u8], attempt: u32) -> Result<u16, DeliveryError> {
        debug!(endpoint = %self.endpoint, attempt, "POST reading");

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_vec())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(status.as_u16());
        }

        let text = response.text().await.unwrap_or_default();
        Err(DeliveryError::Status {
            status: status.as_u16(),
            body: truncate(text, MAX_ERROR_BODY),
        })
    }
}

fn truncate(mut text: String, max: usize) -> String {
    if text.len() > max {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}
