//! The normalized record sent downstream.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{DEFAULT_PRESSURE_HPA, DEFAULT_UV_INDEX, DEFAULT_VISIBILITY_M};

/// A delivery-ready weather reading.
///
/// Field names follow the ingestion API's camelCase body. `processed_at`
/// stays local: the API whitelists its properties and rejects unknown ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalReading {
    /// Human-readable location (city label or "lat,lon")
    pub location: String,

    pub temperature: f64,

    pub humidity: f64,

    /// Atmospheric pressure in hPa
    pub pressure: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,

    /// Visibility in metres
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uv_index: Option<f64>,

    /// Producer tag
    pub source: String,

    /// When the reading was normalized, not when it was observed
    #[serde(skip)]
    pub processed_at: DateTime<Utc>,
}

impl CanonicalReading {
    /// Create a reading with the standard defaults for fields producers do not send.
    pub fn new(location: String, temperature: f64, humidity: f64, source: String) -> Self {
        Self {
            location,
            temperature,
            humidity,
            pressure: DEFAULT_PRESSURE_HPA,
            description: None,
            wind_speed: None,
            visibility: Some(DEFAULT_VISIBILITY_M),
            uv_index: Some(DEFAULT_UV_INDEX),
            source,
            processed_at: Utc::now(),
        }
    }

    /// Set the weather description.
    pub fn with_description(mut self, description: Option<&str>) -> Self {
        self.description = description.map(str::to_string);
        self
    }

    /// Set the wind speed.
    pub fn with_wind_speed(mut self, wind_speed: Option<f64>) -> Self {
        self.wind_speed = wind_speed;
        self
    }

    /// `processed_at` as RFC 3339 UTC, second precision (`2025-06-15T14:30:00Z`).
    pub fn processed_at_rfc3339(&self) -> String {
        self.processed_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_defaults_applied() {
        let reading = CanonicalReading::new("X".into(), 20.0, 50.0, "S".into());
        assert_eq!(reading.pressure, 1013.25);
        assert_eq!(reading.visibility, Some(10000.0));
        assert_eq!(reading.uv_index, Some(0.0));
        assert!(reading.description.is_none());
        assert!(reading.wind_speed.is_none());
    }

    #[test]
    fn test_wire_format() {
        let reading = CanonicalReading::new("São Paulo, SP".into(), 25.5, 65.0, "go-worker".into())
            .with_description(Some("clear sky"))
            .with_wind_speed(Some(10.5));

        let value = serde_json::to_value(&reading).unwrap();
        assert_eq!(
            value,
            json!({
                "location": "São Paulo, SP",
                "temperature": 25.5,
                "humidity": 65.0,
                "pressure": 1013.25,
                "description": "clear sky",
                "windSpeed": 10.5,
                "visibility": 10000.0,
                "uvIndex": 0.0,
                "source": "go-worker"
            })
        );
    }

    #[test]
    fn test_absent_optionals_omitted() {
        let reading = CanonicalReading::new("X".into(), 1.0, 2.0, "S".into());
        let value = serde_json::to_value(&reading).unwrap();
        assert!(value.get("description").is_none());
        assert!(value.get("windSpeed").is_none());
        assert!(value.get("processedAt").is_none());
    }

    #[test]
    fn test_processed_at_format() {
        let mut reading = CanonicalReading::new("X".into(), 1.0, 2.0, "S".into());
        reading.processed_at = DateTime::parse_from_rfc3339("2025-06-15T14:30:00.987Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(reading.processed_at_rfc3339(), "2025-06-15T14:30:00Z");
    }
}
