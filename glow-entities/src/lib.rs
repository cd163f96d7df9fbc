//! Entity model published by the Glow IHD bridge.
//!
//! These types describe what the host platform's entity registry sees: one
//! entity per derived measurement per device, with a stable identity, a unit,
//! a state classification and the latest value.

pub mod domain;

pub use domain::{
    entity_unique_id, slugify, DeviceInfo, EntityCategory, EntityDescriptor, EntityState,
    StatePolicy, StateValue, UnitClass,
};
