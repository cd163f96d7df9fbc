use std::collections::HashMap;

use glow_entities::{EntityDescriptor, EntityState};
use parking_lot::Mutex;

use crate::pipeline::EntitySink;

/// Latest descriptor and state of one entity.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EntitySnapshot {
    pub descriptor: EntityDescriptor,
    pub state: Option<EntityState>,
}

#[derive(Default)]
struct StoreInner {
    descriptors: Vec<EntityDescriptor>,
    states: HashMap<String, EntityState>,
    registrations: usize,
    published: usize,
}

/// Entity registry kept in memory.
///
/// Holds the latest state per entity; used by the replay tool and as the
/// sink in tests.
#[derive(Default)]
pub struct MemoryEntityStore {
    inner: Mutex<StoreInner>,
}

impl MemoryEntityStore {
    /// Registered descriptors, in registration order.
    pub fn descriptors(&self) -> Vec<EntityDescriptor> {
        self.inner.lock().descriptors.clone()
    }

    pub fn state(&self, unique_id: &str) -> Option<EntityState> {
        self.inner.lock().states.get(unique_id).cloned()
    }

    /// Number of `register` calls, one per newly seen device.
    pub fn registrations(&self) -> usize {
        self.inner.lock().registrations
    }

    /// Number of `publish` calls.
    pub fn states_published(&self) -> usize {
        self.inner.lock().published
    }

    pub fn snapshot(&self) -> Vec<EntitySnapshot> {
        let inner = self.inner.lock();
        inner
            .descriptors
            .iter()
            .map(|d| EntitySnapshot {
                descriptor: d.clone(),
                state: inner.states.get(&d.unique_id).cloned(),
            })
            .collect()
    }
}

impl EntitySink for MemoryEntityStore {
    fn register(&self, entities: &[EntityDescriptor]) {
        let mut inner = self.inner.lock();
        inner.registrations += 1;
        for e in entities {
            if !inner.descriptors.iter().any(|d| d.unique_id == e.unique_id) {
                inner.descriptors.push(e.clone());
            }
        }
    }

    fn publish(&self, state: &EntityState) {
        let mut inner = self.inner.lock();
        inner.published += 1;
        inner.states.insert(state.unique_id.clone(), state.clone());
    }
}
