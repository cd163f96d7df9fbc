use std::sync::Arc;

use chrono_tz::Tz;
use glow_entities::{EntityDescriptor, EntityState, StateValue};
use serde_json::Value;
use time::OffsetDateTime;

use super::{EntityOptions, MeasurementDefinition};
use crate::{
    host::HostTimeZone,
    pipeline::EntitySink,
    reset::{message_timestamp, reset_boundary},
};

/// Device-level settings shared by every measurement of one group.
#[derive(Debug, Clone)]
pub struct MeasurementContext {
    pub device_id: String,
    /// Explicit meter time zone; falls back to the host zone when absent.
    pub time_zone: Option<Tz>,
    pub host: HostTimeZone,
    pub options: EntityOptions,
}

/// What a single `update` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The payload does not carry this measurement.
    NotApplicable,
    /// A zero was discarded; nothing changed and nothing was emitted.
    SuppressedZero,
    /// The value was adopted and emitted.
    Updated,
    /// An error sentinel was received; the value is now unknown.
    Faulted,
}

/// Last-known value of one measurement on one device.
pub struct MeasurementState {
    definition: MeasurementDefinition,
    ctx: MeasurementContext,
    unique_id: String,
    current: Option<StateValue>,
    last_reset: Option<OffsetDateTime>,
    sink: Option<Arc<dyn EntitySink>>,
}

impl MeasurementState {
    pub fn new(definition: MeasurementDefinition, ctx: MeasurementContext) -> Self {
        let unique_id = glow_entities::entity_unique_id(&ctx.device_id, definition.name);
        Self {
            definition,
            ctx,
            unique_id,
            current: None,
            last_reset: None,
            sink: None,
        }
    }

    pub fn definition(&self) -> &MeasurementDefinition {
        &self.definition
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn current_value(&self) -> Option<&StateValue> {
        self.current.as_ref()
    }

    pub fn last_reset(&self) -> Option<OffsetDateTime> {
        self.last_reset
    }

    pub fn descriptor(&self) -> EntityDescriptor {
        self.definition.descriptor(&self.ctx.device_id, self.ctx.options)
    }

    pub fn entity_state(&self) -> EntityState {
        EntityState {
            unique_id: self.unique_id.clone(),
            device_id: self.ctx.device_id.clone(),
            value: self.current.clone(),
            last_reset: self.last_reset,
        }
    }

    /// Start emitting change notifications to `sink`.
    pub fn attach_sink(&mut self, sink: Arc<dyn EntitySink>) {
        self.sink = Some(sink);
    }

    /// Apply one decoded payload.
    pub fn update(&mut self, payload: &Value) -> UpdateOutcome {
        let value = match self.definition.derivation.derive(payload) {
            Ok(v) => v,
            Err(e) => {
                tracing::trace!(entity = %self.unique_id, error = %e, "measurement not in payload");
                return UpdateOutcome::NotApplicable;
            }
        };

        if self.definition.is_suppressed_zero(value.as_ref()) {
            tracing::debug!(entity = %self.unique_id, "ignored zero value");
            metrics::counter!("glow_measurements_suppressed_total").increment(1);
            return UpdateOutcome::SuppressedZero;
        }

        let outcome = if self.definition.is_error_sentinel(value.as_ref()) {
            tracing::debug!(
                entity = %self.unique_id,
                value = ?value,
                "received error response value, state unknown"
            );
            metrics::counter!("glow_measurement_faults_total").increment(1);
            self.current = None;
            UpdateOutcome::Faulted
        } else {
            self.current = value;
            UpdateOutcome::Updated
        };

        self.refresh_last_reset(payload);
        metrics::counter!("glow_measurements_updated_total").increment(1);
        self.notify();

        outcome
    }

    fn refresh_last_reset(&mut self, payload: &Value) {
        let Some(interval) = self.definition.reset_interval() else {
            return;
        };
        let Some(zone) = self.ctx.time_zone.or_else(|| self.ctx.host.get()) else {
            tracing::debug!(entity = %self.unique_id, "no time zone available, last reset not updated");
            metrics::counter!("glow_reset_boundary_skipped_total").increment(1);
            return;
        };

        match message_timestamp(payload).and_then(|at| reset_boundary(at, zone, interval)) {
            Ok(boundary) => self.last_reset = Some(boundary),
            Err(e) => {
                tracing::debug!(entity = %self.unique_id, error = %e, "last reset not updated");
                metrics::counter!("glow_reset_boundary_skipped_total").increment(1);
            }
        }
    }

    fn notify(&self) {
        if let Some(sink) = &self.sink {
            sink.publish(&self.entity_state());
        }
    }
}

impl std::fmt::Debug for MeasurementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasurementState")
            .field("unique_id", &self.unique_id)
            .field("current", &self.current)
            .field("last_reset", &self.last_reset)
            .field("sink_attached", &self.sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        measurement::catalog::{ELECTRICITY_MEASUREMENTS, GAS_MEASUREMENTS},
        sinks::MemoryEntityStore,
    };
    use serde_json::json;
    use time::macros::datetime;

    fn ctx(time_zone: Option<Tz>, host: HostTimeZone) -> MeasurementContext {
        MeasurementContext {
            device_id: "1234567890AB".to_string(),
            time_zone,
            host,
            options: EntityOptions::default(),
        }
    }

    fn electricity(name: &str) -> MeasurementDefinition {
        ELECTRICITY_MEASUREMENTS
            .iter()
            .find(|d| d.name == name)
            .cloned()
            .unwrap()
    }

    fn electricity_payload(cumulative: f64, power: f64) -> Value {
        json!({"electricitymeter": {
            "timestamp": "2022-06-11T23:54:53Z",
            "energy": {
                "export": {"cumulative": 0.0},
                "import": {
                    "cumulative": cumulative,
                    "day": 13.252, "week": 141.71, "month": 293.598,
                    "price": {"unitrate": 0.04998, "standingcharge": 0.2403}
                }
            },
            "power": {"value": power}
        }})
    }

    #[test]
    fn zero_on_suppressed_measurement_keeps_previous_value() {
        let mut s = MeasurementState::new(
            electricity("Smart Meter Electricity: Import"),
            ctx(None, HostTimeZone::default()),
        );
        let store = Arc::new(MemoryEntityStore::default());
        s.attach_sink(store.clone());

        assert_eq!(s.update(&electricity_payload(6613.405, 0.951)), UpdateOutcome::Updated);
        assert_eq!(s.update(&electricity_payload(0.0, 0.951)), UpdateOutcome::SuppressedZero);

        assert_eq!(s.current_value(), Some(&StateValue::Number(6613.405)));
        assert_eq!(store.states_published(), 1);
    }

    #[test]
    fn zero_on_unsuppressed_measurement_is_adopted() {
        let mut s = MeasurementState::new(
            electricity("Smart Meter Electricity: Export"),
            ctx(None, HostTimeZone::default()),
        );
        assert_eq!(s.update(&electricity_payload(1.0, 1.0)), UpdateOutcome::Updated);
        assert_eq!(s.current_value(), Some(&StateValue::Number(0.0)));
    }

    #[test]
    fn power_sentinel_becomes_unknown_and_is_emitted() {
        let mut s = MeasurementState::new(
            electricity("Smart Meter Electricity: Power"),
            ctx(None, HostTimeZone::default()),
        );
        let store = Arc::new(MemoryEntityStore::default());
        s.attach_sink(store.clone());

        s.update(&electricity_payload(1.0, 0.951));
        assert_eq!(s.update(&electricity_payload(1.0, -8388.608)), UpdateOutcome::Faulted);

        assert_eq!(s.current_value(), None);
        assert_eq!(store.states_published(), 2);
        assert_eq!(store.state(s.unique_id()).unwrap().value, None);
    }

    #[test]
    fn foreign_payload_is_a_silent_no_op() {
        let mut s = MeasurementState::new(
            electricity("Smart Meter Electricity: Power"),
            ctx(None, HostTimeZone::default()),
        );
        let store = Arc::new(MemoryEntityStore::default());
        s.attach_sink(store.clone());

        let state_msg = json!({"software": "v1.8.12", "han": {"rssi": -75}});
        assert_eq!(s.update(&state_msg), UpdateOutcome::NotApplicable);
        assert_eq!(store.states_published(), 0);
    }

    #[test]
    fn updates_before_sink_attachment_are_not_an_error() {
        let mut s = MeasurementState::new(
            electricity("Smart Meter Electricity: Power"),
            ctx(None, HostTimeZone::default()),
        );
        assert_eq!(s.update(&electricity_payload(1.0, 0.5)), UpdateOutcome::Updated);
        assert_eq!(s.current_value(), Some(&StateValue::Number(0.5)));
    }

    #[test]
    fn daily_cost_last_reset_uses_message_timestamp_and_meter_zone() {
        let mut s = MeasurementState::new(
            electricity("Smart Meter Electricity: Cost (Today)"),
            ctx(Some(chrono_tz::Europe::London), HostTimeZone::default()),
        );
        s.update(&electricity_payload(1.0, 1.0));

        assert_eq!(s.current_value(), Some(&StateValue::Number(0.9)));
        assert_eq!(s.last_reset(), Some(datetime!(2022-06-11 23:00:00 UTC)));
        assert!(s.last_reset().unwrap() <= datetime!(2022-06-11 23:54:53 UTC));
    }

    #[test]
    fn host_zone_is_read_at_update_time() {
        let host = HostTimeZone::default();
        let mut s = MeasurementState::new(
            electricity("Smart Meter Electricity: Cost (Today)"),
            ctx(None, host.clone()),
        );

        s.update(&electricity_payload(1.0, 1.0));
        assert_eq!(s.current_value(), Some(&StateValue::Number(0.9)));
        assert_eq!(s.last_reset(), None);

        host.set(Some(chrono_tz::America::New_York));
        s.update(&electricity_payload(1.0, 1.0));
        // 23:54 UTC on 11 June is 19:54 EDT on 11 June.
        assert_eq!(s.last_reset(), Some(datetime!(2022-06-11 04:00:00 UTC)));
    }

    #[test]
    fn missing_timestamp_still_emits_value() {
        let mut s = MeasurementState::new(
            electricity("Smart Meter Electricity: Cost (Today)"),
            ctx(Some(chrono_tz::Europe::London), HostTimeZone::default()),
        );
        let store = Arc::new(MemoryEntityStore::default());
        s.attach_sink(store.clone());

        let mut payload = electricity_payload(1.0, 1.0);
        payload["electricitymeter"]
            .as_object_mut()
            .unwrap()
            .remove("timestamp");

        assert_eq!(s.update(&payload), UpdateOutcome::Updated);
        assert_eq!(s.last_reset(), None);
        assert_eq!(store.states_published(), 1);
    }

    #[test]
    fn gas_cumulative_passes_through_suppression() {
        let def = GAS_MEASUREMENTS
            .iter()
            .find(|d| d.name == "Smart Meter Gas: Import")
            .cloned()
            .unwrap();
        assert!(def.suppress_zero);

        let mut s = MeasurementState::new(def, ctx(None, HostTimeZone::default()));
        let payload = json!({"gasmeter": {"energy": {"import": {"cumulative": 17940.852}}}});
        s.update(&payload);
        assert_eq!(s.current_value(), Some(&StateValue::Number(17940.852)));
    }
}
