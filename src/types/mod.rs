//! Core types for the bridge.

mod config;
mod observation;
mod reading;

pub use config::{
    BridgeConfig, DeliverySettings, LogFormat, NormalizerSettings, QueueSettings,
    SchemaSelection,
};
pub use observation::{
    Coordinates, CurrentConditions, FlatObservation, NestedObservation, RawObservation,
    SchemaVariant,
};
pub use reading::CanonicalReading;
