//! Weather Bridge Library
//!
//! Consumes raw weather observations from a RabbitMQ queue, normalizes them
//! into a single reading shape and forwards each one to an HTTP ingestion API.
//! Supports both the flat producer payload and the nested Open-Meteo style payload.

pub mod error;
pub mod messaging;
pub mod output;
pub mod processing;
pub mod types;

#[cfg(test)]
mod test_support;

pub use error::{
    ConfigError, DeliveryError, NormalizationError, PipelineError, QueueError, ValidationError,
};
pub use messaging::{ConnectionManager, ConsumptionLoop, ConsumptionStats, MessageProcessor};
pub use output::{DeliveryClient, DeliveryOutcome};
pub use processing::{Normalizer, WeatherPipeline};
pub use types::{BridgeConfig, CanonicalReading, RawObservation};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::*;
    pub use crate::messaging::*;
    pub use crate::output::*;
    pub use crate::processing::{Normalizer, WeatherPipeline};
    pub use crate::types::*;
}

/// Pressure reported when the producer sends none (hPa)
pub const DEFAULT_PRESSURE_HPA: f64 = 1013.25;

/// Visibility reported when the producer sends none (metres)
pub const DEFAULT_VISIBILITY_M: f64 = 10_000.0;

/// UV index reported when the producer sends none
pub const DEFAULT_UV_INDEX: f64 = 0.0;

/// Unacknowledged deliveries the broker may push to this consumer
pub const PREFETCH_COUNT: u16 = 1;
