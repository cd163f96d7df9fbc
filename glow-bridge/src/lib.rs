//! Turns the MQTT telemetry of Hildebrand Glow in-home displays into
//! host-platform sensor entities.
//!
//! Raw `(topic, payload)` pairs enter through [`Dispatcher::on_message`],
//! are routed to the device's [`UpdateGroup`]s and reach an
//! [`EntitySink`] as descriptors and state changes.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod group;
pub mod host;
pub mod measurement;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod registry;
pub mod reset;
pub mod sinks;
pub mod sources;
pub mod transform;

pub use dispatcher::{DeviceFilter, DispatchOutcome, Dispatcher};
pub use error::BridgeError;
pub use group::{GroupKind, UpdateGroup};
pub use host::HostTimeZone;
pub use pipeline::{EntitySink, Envelope, MqttMessage, Pipeline};
pub use registry::{DeviceRegistry, RegistryConfig};
