//! Per-message pipeline: normalize, then deliver.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::normalizer::Normalizer;
use crate::error::PipelineError;
use crate::messaging::MessageProcessor;
use crate::output::DeliveryClient;

/// Normalizes a payload and forwards the resulting reading downstream.
pub struct WeatherPipeline {
    normalizer: Normalizer,
    delivery: DeliveryClient,
}

impl WeatherPipeline {
    pub fn new(normalizer: Normalizer, delivery: DeliveryClient) -> Self {
        Self {
            normalizer,
            delivery,
        }
    }
}

#[async_trait]
impl MessageProcessor for WeatherPipeline {
    async fn process(&self, payload: &[u8]) -> Result<(), PipelineError> {
        let reading = match self.normalizer.normalize(payload) {
            Ok(reading) => reading,
            Err(e) => {
                warn!(error = %e, "Discarding payload that failed normalization");
                return Err(e.into());
            }
        };

        let outcome = self.delivery.deliver(&reading).await;
        debug!(
            location = %reading.location,
            attempts = outcome.attempts(),
            success = outcome.is_success(),
            "Delivery finished"
        );
        outcome.into_result()
    }

    fn name(&self) -> &str {
        "weather-pipeline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DeliveryError, NormalizationError, ValidationError};
    use crate::messaging::{ConsumptionLoop, ConsumptionStats};
    use crate::test_support::{ChannelSource, Settled, StubApi};
    use crate::types::{NormalizerSettings, SchemaSelection};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};
    use tokio_util::sync::CancellationToken;

    fn pipeline(api: &StubApi, max_attempts: u32) -> WeatherPipeline {
        let normalizer = Normalizer::new(NormalizerSettings {
            schema: SchemaSelection::Detect,
            default_source: "go-worker".to_string(),
        });
        let delivery =
            DeliveryClient::new(&api.settings(max_attempts, Duration::from_millis(10))).unwrap();
        WeatherPipeline::new(normalizer, delivery)
    }

    fn nested_payload() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "timestamp": "2025-06-15T14:30:00.123456",
            "location": {"latitude": -23.5505, "longitude": -46.6333, "timezone": "America/Sao_Paulo"},
            "current": {
                "temperature": 25.5,
                "humidity": 65.0,
                "precipitation": 0.0,
                "wind_speed": 10.5,
                "weather_code": 1,
                "time": "2025-06-15T14:30"
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_valid_nested_message_is_posted() {
        let api = StubApi::start(&[201]).await;
        assert_ok!(pipeline(&api, 3).process(&nested_payload()).await);

        assert_eq!(api.hits(), 1);
        assert_eq!(
            api.bodies(),
            vec![json!({
                "location": "São Paulo, SP",
                "temperature": 25.5,
                "humidity": 65.0,
                "pressure": 1013.25,
                "description": "partly cloudy",
                "windSpeed": 10.5,
                "visibility": 10000.0,
                "uvIndex": 0.0,
                "source": "go-worker"
            })]
        );
    }

    #[tokio::test]
    async fn test_invalid_payload_never_reaches_api() {
        let api = StubApi::start(&[200]).await;
        let pipeline = pipeline(&api, 3);

        let err = assert_err!(pipeline.process(b"{not json").await);
        assert!(matches!(
            err,
            PipelineError::Normalization(NormalizationError::Deserialization(_))
        ));

        let flat = json!({"location": "X", "temperature": 150.0, "humidity": 50.0,
            "timestamp": "2025-06-15T14:30:00Z", "source": "S"});
        let err = assert_err!(pipeline.process(&serde_json::to_vec(&flat).unwrap()).await);
        assert!(matches!(
            err,
            PipelineError::Normalization(NormalizationError::Validation(
                ValidationError::InvalidTemperature(_)
            ))
        ));

        assert_eq!(api.hits(), 0);
    }

    #[tokio::test]
    async fn test_client_error_is_terminal() {
        let api = StubApi::start(&[400]).await;

        let err = assert_err!(pipeline(&api, 3).process(&nested_payload()).await);
        assert!(matches!(
            err,
            PipelineError::TerminalDelivery(DeliveryError::Status { status: 400, .. })
        ));
        assert_eq!(api.hits(), 1);
    }

    #[tokio::test]
    async fn test_server_errors_exhaust_retries() {
        let api = StubApi::start(&[503]).await;

        let err = assert_err!(pipeline(&api, 2).process(&nested_payload()).await);
        assert!(matches!(
            err,
            PipelineError::RetriesExhausted { attempts: 2, .. }
        ));
        assert_eq!(api.hits(), 2);
    }

    #[tokio::test]
    async fn test_loop_settles_pipeline_results() {
        let api = StubApi::start(&[200, 400]).await;
        let (source, sender, observer) = ChannelSource::new();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            ConsumptionLoop::new(source, pipeline(&api, 3)).run(shutdown.clone()),
        );

        sender.send(b"garbage".to_vec()).await.unwrap();
        sender.send(nested_payload()).await.unwrap();
        sender.send(nested_payload()).await.unwrap();
        while observer.settled().len() < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        shutdown.cancel();

        let stats = handle.await.unwrap().unwrap();
        assert_eq!(
            observer.settled(),
            vec![Settled::Rejected(1), Settled::Acked(2), Settled::Rejected(3)]
        );
        assert_eq!(
            stats,
            ConsumptionStats {
                received: 3,
                acked: 1,
                rejected: 2,
                settle_failures: 0,
            }
        );
        assert_eq!(api.hits(), 2);
    }
}
