//! Decoding, validation and normalization of queue payloads.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use super::{location, weather_code};
use crate::error::{NormalizationError, ValidationError};
use crate::types::{
    CanonicalReading, FlatObservation, NestedObservation, NormalizerSettings, RawObservation,
    SchemaSelection, SchemaVariant,
};

const TEMPERATURE_RANGE: std::ops::RangeInclusive<f64> = -100.0..=100.0;
const HUMIDITY_RANGE: std::ops::RangeInclusive<f64> = 0.0..=100.0;

/// Unix seconds of 0001-01-01T00:00:00Z, emitted by producers that never set the timestamp.
const ZERO_INSTANT_SECS: i64 = -62_135_596_800;

/// Turns raw payload bytes into a `CanonicalReading`.
///
/// Steps run in order and stop at the first failure: decode, validate,
/// transform.
#[derive(Debug, Clone)]
pub struct Normalizer {
    settings: NormalizerSettings,
}

impl Normalizer {
    /// Create a new normalizer.
    pub fn new(settings: NormalizerSettings) -> Self {
        Self { settings }
    }

    /// Decode, validate and transform one payload.
    pub fn normalize(&self, payload: &[u8]) -> Result<CanonicalReading, NormalizationError> {
        let raw = self.decode(payload)?;
        self.validate(&raw)?;

        let reading = self.transform(&raw);
        debug!(
            variant = %raw.variant(),
            location = %reading.location,
            temperature = reading.temperature,
            humidity = reading.humidity,
            processed_at = %reading.processed_at_rfc3339(),
            "Observation normalized"
        );
        Ok(reading)
    }

    /// Decode the payload with the configured schema strategy.
    pub fn decode(&self, payload: &[u8]) -> Result<RawObservation, NormalizationError> {
        let raw = match self.settings.schema {
            SchemaSelection::Fixed(SchemaVariant::Flat) => {
                RawObservation::Flat(serde_json::from_slice::<FlatObservation>(payload)?)
            }
            SchemaSelection::Fixed(SchemaVariant::Nested) => {
                RawObservation::Nested(serde_json::from_slice::<NestedObservation>(payload)?)
            }
            SchemaSelection::Detect => {
                let value: Value = serde_json::from_slice(payload)?;
                match detect_variant(&value) {
                    SchemaVariant::Flat => RawObservation::Flat(serde_json::from_value(value)?),
                    SchemaVariant::Nested => RawObservation::Nested(serde_json::from_value(value)?),
                }
            }
        };
        Ok(raw)
    }

    /// Check domain rules. Order: location, source, temperature, humidity, timestamp.
    pub fn validate(&self, raw: &RawObservation) -> Result<(), ValidationError> {
        match raw {
            RawObservation::Flat(obs) => {
                if obs.location.trim().is_empty() {
                    return Err(ValidationError::InvalidLocation);
                }
                if obs.source.trim().is_empty() {
                    return Err(ValidationError::MissingSource);
                }
            }
            RawObservation::Nested(obs) => match &obs.location {
                Some(coordinates) if location::is_valid(coordinates) => {}
                _ => return Err(ValidationError::InvalidLocation),
            },
        }

        let temperature = raw.temperature();
        if !TEMPERATURE_RANGE.contains(&temperature) {
            return Err(ValidationError::InvalidTemperature(temperature));
        }

        let humidity = raw.humidity();
        if !HUMIDITY_RANGE.contains(&humidity) {
            return Err(ValidationError::InvalidHumidity(humidity));
        }

        let has_timestamp = match raw {
            RawObservation::Flat(obs) => obs.timestamp.is_some_and(|ts| !is_zero_instant(&ts)),
            RawObservation::Nested(obs) => obs
                .timestamp
                .as_deref()
                .is_some_and(|ts| !ts.trim().is_empty()),
        };
        if !has_timestamp {
            return Err(ValidationError::MissingTimestamp);
        }

        Ok(())
    }

    /// Map a validated observation to the delivery shape.
    fn transform(&self, raw: &RawObservation) -> CanonicalReading {
        match raw {
            RawObservation::Flat(obs) => CanonicalReading::new(
                obs.location.trim().to_string(),
                obs.temperature,
                obs.humidity,
                obs.source.trim().to_string(),
            ),
            RawObservation::Nested(obs) => {
                let location = obs
                    .location
                    .as_ref()
                    .map(location::resolve)
                    .unwrap_or_default();

                CanonicalReading::new(
                    location,
                    obs.current.temperature,
                    obs.current.humidity,
                    self.settings.default_source.clone(),
                )
                .with_description(obs.current.weather_code.map(weather_code::describe))
                .with_wind_speed(obs.current.wind_speed)
            }
        }
    }
}

fn is_zero_instant(ts: &DateTime<Utc>) -> bool {
    *ts == DateTime::<Utc>::MIN_UTC
        || (ts.timestamp() == ZERO_INSTANT_SECS && ts.timestamp_subsec_nanos() == 0)
}

/// An object-valued `location` or a `current` block marks the nested shape.
pub fn detect_variant(value: &Value) -> SchemaVariant {
    let nested = value.get("current").is_some()
        || value.get("location").is_some_and(Value::is_object);

    if nested {
        SchemaVariant::Nested
    } else {
        SchemaVariant::Flat
    }
}
