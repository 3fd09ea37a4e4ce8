//! Inbound observation shapes as published by the producers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Which producer schema a payload follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaVariant {
    /// `{location, temperature, humidity, timestamp, source}`
    Flat,
    /// `{timestamp, location: {latitude, longitude, timezone}, current: {...}}`
    Nested,
}

impl std::fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaVariant::Flat => write!(f, "flat"),
            SchemaVariant::Nested => write!(f, "nested"),
        }
    }
}

/// Flat observation with a free-form location string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatObservation {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub location: String,

    pub temperature: f64,

    pub humidity: f64,

    /// RFC 3339 instant; a malformed value fails deserialization.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub source: String,
}

/// Treat an explicit `null` like an absent string so validation reports it.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Coordinates block of a nested observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// Current conditions block of a nested observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature: f64,
    pub humidity: f64,
    #[serde(default)]
    pub precipitation: Option<f64>,
    #[serde(default)]
    pub wind_speed: Option<f64>,
    #[serde(default)]
    pub weather_code: Option<i64>,
    #[serde(default)]
    pub time: Option<String>,
}

/// Coordinate-based observation as emitted by the Open-Meteo collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NestedObservation {
    /// ISO-8601 text; producers may omit the offset, so it is kept verbatim.
    #[serde(default)]
    pub timestamp: Option<String>,

    #[serde(default)]
    pub location: Option<Coordinates>,

    pub current: CurrentConditions,
}

/// A decoded queue message, before validation.
#[derive(Debug, Clone)]
pub enum RawObservation {
    Flat(FlatObservation),
    Nested(NestedObservation),
}

impl RawObservation {
    pub fn variant(&self) -> SchemaVariant {
        match self {
            RawObservation::Flat(_) => SchemaVariant::Flat,
            RawObservation::Nested(_) => SchemaVariant::Nested,
        }
    }

    pub fn temperature(&self) -> f64 {
        match self {
            RawObservation::Flat(obs) => obs.temperature,
            RawObservation::Nested(obs) => obs.current.temperature,
        }
    }

    pub fn humidity(&self) -> f64 {
        match self {
            RawObservation::Flat(obs) => obs.humidity,
            RawObservation::Nested(obs) => obs.current.humidity,
        }
    }
}
