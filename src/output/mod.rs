//! Output module for forwarding readings to the downstream API.

mod delivery_client;

pub use delivery_client::{backoff_delay, DeliveryClient, DeliveryOutcome};
