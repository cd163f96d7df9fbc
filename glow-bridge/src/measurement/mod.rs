pub mod catalog;
pub mod definition;
pub mod state;

pub use definition::{EntityOptions, MeasurementDefinition};
pub use state::{MeasurementContext, MeasurementState, UpdateOutcome};
