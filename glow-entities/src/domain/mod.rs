pub mod device;
pub mod entity;
pub mod slug;

pub use device::DeviceInfo;
pub use entity::{EntityCategory, EntityDescriptor, EntityState, StatePolicy, StateValue, UnitClass};
pub use slug::{entity_unique_id, slugify};
