use glow_entities::{EntityDescriptor, EntityState};

use crate::pipeline::EntitySink;

/// Sink that only traces entity events. Useful when running against a live
/// broker to see what would be published.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEntitySink;

impl EntitySink for LogEntitySink {
    fn register(&self, entities: &[EntityDescriptor]) {
        for e in entities {
            tracing::info!(
                unique_id = %e.unique_id,
                name = %e.name,
                unit = e.unit.unit().unwrap_or(""),
                "entity registered"
            );
        }
    }

    fn publish(&self, state: &EntityState) {
        tracing::info!(
            unique_id = %state.unique_id,
            value = ?state.value,
            last_reset = ?state.last_reset,
            "state changed"
        );
    }
}
