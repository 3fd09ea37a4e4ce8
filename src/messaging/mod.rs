//! # Messaging Module
//!
//! RabbitMQ intake for the bridge.
//!
//! ## Features
//! - Startup connection with bounded retry
//! - Durable queue declaration with prefetch 1
//! - Serial consumption loop with manual ack / reject-without-requeue
//! - Cooperative shutdown through a cancellation token

pub mod connection;
pub mod consumer;
pub mod handler;
pub mod source;

pub use connection::{retry_connect, ConnectionManager};
pub use consumer::{ConsumptionLoop, ConsumptionStats, LoopState};
pub use handler::{Disposition, MessageProcessor};
pub use source::{Acknowledger, AmqpSource, InboundMessage, MessageSource};
