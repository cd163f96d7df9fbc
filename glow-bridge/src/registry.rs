use std::{collections::HashMap, sync::Arc};

use chrono_tz::Tz;
use parking_lot::Mutex;

use crate::{
    group::{GroupKind, UpdateGroup},
    host::HostTimeZone,
    measurement::{EntityOptions, MeasurementContext},
    pipeline::EntitySink,
};

/// The update groups of one device. Locking it serialises every update for
/// that device.
pub type DeviceGroups = Arc<Mutex<Vec<UpdateGroup>>>;

/// Settings applied to every device the registry creates.
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    pub time_zone_electricity: Option<Tz>,
    pub time_zone_gas: Option<Tz>,
    pub host: HostTimeZone,
    pub force_update: bool,
    pub hide_gas_sensors: bool,
}

/// Canonical form of a device id: trimmed, upper-case, no `:` or spaces.
pub fn normalize_device_id(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| *c != ':' && *c != ' ')
        .flat_map(char::to_uppercase)
        .collect()
}

/// Lazily created, append-only map from device id to its update groups.
pub struct DeviceRegistry {
    config: RegistryConfig,
    sink: Option<Arc<dyn EntitySink>>,
    devices: Mutex<HashMap<String, DeviceGroups>>,
}

impl DeviceRegistry {
    pub fn new(config: RegistryConfig, sink: Option<Arc<dyn EntitySink>>) -> Self {
        Self {
            config,
            sink,
            devices: Mutex::new(HashMap::new()),
        }
    }

    /// Groups for `device_id` in fixed order: status, electricity, gas.
    ///
    /// The first call for a device builds the groups, registers their
    /// entities with the sink and attaches it; later calls return the same
    /// groups.
    pub fn groups_for(&self, device_id: &str) -> DeviceGroups {
        let key = normalize_device_id(device_id);
        let mut devices = self.devices.lock();

        if let Some(groups) = devices.get(&key) {
            return Arc::clone(groups);
        }

        tracing::info!(device_id = %key, "new device found");
        let groups = Arc::new(Mutex::new(self.build_groups(&key)));
        devices.insert(key, Arc::clone(&groups));
        metrics::gauge!("glow_devices_registered").set(devices.len() as f64);

        groups
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.devices.lock().contains_key(&normalize_device_id(device_id))
    }

    pub fn device_count(&self) -> usize {
        self.devices.lock().len()
    }

    pub fn device_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.devices.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn build_groups(&self, device_id: &str) -> Vec<UpdateGroup> {
        let mut groups: Vec<UpdateGroup> = GroupKind::ALL
            .iter()
            .map(|kind| UpdateGroup::for_kind(*kind, self.context_for(*kind, device_id)))
            .collect();

        if let Some(sink) = &self.sink {
            let descriptors: Vec<_> = groups.iter().flat_map(UpdateGroup::descriptors).collect();
            sink.register(&descriptors);
            for g in &mut groups {
                g.attach_sink(sink);
            }
        }

        groups
    }

    fn context_for(&self, kind: GroupKind, device_id: &str) -> MeasurementContext {
        let time_zone = match kind {
            GroupKind::DeviceStatus => None,
            GroupKind::Electricity => self.config.time_zone_electricity,
            GroupKind::Gas => self.config.time_zone_gas,
        };
        let visible_by_default = !(kind == GroupKind::Gas && self.config.hide_gas_sensors);

        MeasurementContext {
            device_id: device_id.to_string(),
            time_zone,
            host: self.config.host.clone(),
            options: EntityOptions {
                force_update: self.config.force_update,
                visible_by_default,
            },
        }
    }
}
