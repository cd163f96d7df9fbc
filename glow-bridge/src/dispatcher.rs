use std::time::Instant;

use crate::{
    error::BridgeError,
    group::GroupOutcome,
    registry::{normalize_device_id, DeviceRegistry},
};

/// Which devices on the broker this bridge publishes entities for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceFilter {
    AnyDevice,
    Exact(String),
}

impl DeviceFilter {
    /// Configuration value meaning "every device".
    pub const WILDCARD: &'static str = "+";

    /// Parse a configured filter. `+` (or an empty value) accepts all
    /// devices; anything else is normalised like a device id.
    pub fn parse(raw: &str) -> Self {
        let id = normalize_device_id(raw);
        if id.is_empty() || id == Self::WILDCARD {
            Self::AnyDevice
        } else {
            Self::Exact(id)
        }
    }

    pub fn accepts(&self, device_id: &str) -> bool {
        match self {
            Self::AnyDevice => true,
            Self::Exact(id) => id == device_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    OutsidePrefix,
    MissingDeviceId,
    FilteredDevice,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Ignored(IgnoreReason),
    Dispatched { matched_groups: usize, emitted: usize },
    /// A matching group could not decode the payload; the message was dropped.
    Dropped(BridgeError),
}

/// Entry point for raw `(topic, payload)` pairs from the transport.
pub struct Dispatcher {
    prefix: String,
    filter: DeviceFilter,
    registry: DeviceRegistry,
}

impl Dispatcher {
    pub fn new(prefix: impl Into<String>, filter: DeviceFilter, registry: DeviceRegistry) -> Self {
        Self {
            prefix: prefix.into(),
            filter,
            registry,
        }
    }

    /// MQTT filter the transport should subscribe with.
    pub fn subscription_topic(&self) -> String {
        format!("{}/#", self.prefix)
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn filter(&self) -> &DeviceFilter {
        &self.filter
    }

    /// Extract the device id, the topic segment right after the prefix.
    pub fn device_id_of<'t>(&self, topic: &'t str) -> Option<&'t str> {
        topic
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix('/')?
            .split('/')
            .next()
            .filter(|id| !id.is_empty())
    }

    /// Route one message. Never fails: malformed input is logged and dropped.
    pub fn on_message(&self, topic: &str, payload: &[u8]) -> DispatchOutcome {
        metrics::counter!("glow_messages_received_total").increment(1);
        let started = Instant::now();

        let outcome = self.route(topic, payload);
        match &outcome {
            DispatchOutcome::Ignored(reason) => {
                tracing::trace!(topic, ?reason, "message ignored");
                metrics::counter!("glow_messages_ignored_total").increment(1);
            }
            DispatchOutcome::Dropped(e) => {
                tracing::warn!(topic, error = %e, "dropping message");
                metrics::counter!("glow_payload_decode_errors_total").increment(1);
            }
            DispatchOutcome::Dispatched { .. } => {
                metrics::histogram!("glow_dispatch_latency_seconds").record(started.elapsed().as_secs_f64());
            }
        }

        outcome
    }

    fn route(&self, topic: &str, payload: &[u8]) -> DispatchOutcome {
        let Some(raw_id) = self.device_id_of(topic) else {
            return if topic.starts_with(&format!("{}/", self.prefix)) {
                DispatchOutcome::Ignored(IgnoreReason::MissingDeviceId)
            } else {
                DispatchOutcome::Ignored(IgnoreReason::OutsidePrefix)
            };
        };

        let device_id = normalize_device_id(raw_id);
        if !self.filter.accepts(&device_id) {
            return DispatchOutcome::Ignored(IgnoreReason::FilteredDevice);
        }

        tracing::debug!(topic, "received message");
        tracing::trace!(topic, payload = %String::from_utf8_lossy(payload), "payload");

        let groups = self.registry.groups_for(&device_id);
        let mut groups = groups.lock();

        let mut matched_groups = 0;
        let mut emitted = 0;
        let mut failure = None;

        for group in groups.iter_mut() {
            match group.process_update(topic, payload) {
                Ok(GroupOutcome::NotMatched) => {}
                Ok(GroupOutcome::Applied { emitted: n }) => {
                    matched_groups += 1;
                    emitted += n;
                }
                Err(e) => failure = Some(e),
            }
        }

        match failure {
            Some(e) => DispatchOutcome::Dropped(e),
            None => DispatchOutcome::Dispatched {
                matched_groups,
                emitted,
            },
        }
    }
}
