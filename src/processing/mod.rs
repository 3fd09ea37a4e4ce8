//! Payload processing: decoding, validation, enrichment and the per-message pipeline.

pub mod location;
pub mod normalizer;
pub mod pipeline;
pub mod weather_code;

pub use normalizer::{detect_variant, Normalizer};
pub use pipeline::WeatherPipeline;
