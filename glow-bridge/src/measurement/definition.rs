use glow_entities::{
    entity_unique_id, DeviceInfo, EntityCategory, EntityDescriptor, StatePolicy, StateValue,
    UnitClass,
};

use crate::{reset::MeterInterval, transform::Derivation};

/// Declarative description of one derivable quantity.
///
/// Definitions are `const` data; the catalog builds them with the chained
/// `const fn` setters below.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementDefinition {
    /// Display name, unique within its group.
    pub name: &'static str,
    pub unit: UnitClass,
    pub state_policy: Option<StatePolicy>,
    /// Calendar window the value resets on. Only set for periodic totals.
    pub interval: Option<MeterInterval>,
    pub derivation: Derivation,
    /// Treat an exact 0 as noise and keep the previous value.
    pub suppress_zero: bool,
    /// Values the hardware sends in place of a faulty reading.
    pub error_sentinels: &'static [f64],
    pub category: Option<EntityCategory>,
    pub icon: &'static str,
}

/// Per-group presentation flags copied onto every descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityOptions {
    pub force_update: bool,
    pub visible_by_default: bool,
}

impl Default for EntityOptions {
    fn default() -> Self {
        Self {
            force_update: false,
            visible_by_default: true,
        }
    }
}

impl MeasurementDefinition {
    pub const fn new(
        name: &'static str,
        unit: UnitClass,
        state_policy: Option<StatePolicy>,
        derivation: Derivation,
        icon: &'static str,
    ) -> Self {
        Self {
            name,
            unit,
            state_policy,
            interval: None,
            derivation,
            suppress_zero: false,
            error_sentinels: &[],
            category: None,
            icon,
        }
    }

    pub const fn suppress_zero(mut self) -> Self {
        self.suppress_zero = true;
        self
    }

    pub const fn error_sentinels(mut self, sentinels: &'static [f64]) -> Self {
        self.error_sentinels = sentinels;
        self
    }

    pub const fn resets_every(mut self, interval: MeterInterval) -> Self {
        self.interval = Some(interval);
        self
    }

    pub const fn diagnostic(mut self) -> Self {
        self.category = Some(EntityCategory::Diagnostic);
        self
    }

    /// Whether `value` should be dropped as a transient zero reading.
    pub fn is_suppressed_zero(&self, value: Option<&StateValue>) -> bool {
        self.suppress_zero && matches!(value, Some(StateValue::Number(n)) if *n == 0.0)
    }

    pub fn is_error_sentinel(&self, value: Option<&StateValue>) -> bool {
        match value {
            Some(StateValue::Number(n)) => self.error_sentinels.contains(n),
            _ => false,
        }
    }

    /// The interval, but only when the state policy makes it meaningful.
    pub fn reset_interval(&self) -> Option<MeterInterval> {
        match self.state_policy {
            Some(StatePolicy::PeriodicTotal) => self.interval,
            _ => None,
        }
    }

    pub fn descriptor(&self, device_id: &str, options: EntityOptions) -> EntityDescriptor {
        EntityDescriptor {
            unique_id: entity_unique_id(device_id, self.name),
            name: self.name.to_string(),
            device_id: device_id.to_string(),
            unit: self.unit,
            state_policy: self.state_policy,
            category: self.category,
            icon: Some(self.icon.to_string()),
            has_last_reset: self.reset_interval().is_some(),
            force_update: options.force_update,
            visible_by_default: options.visible_by_default,
            device: DeviceInfo::glow_ihd(device_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POWER: MeasurementDefinition = MeasurementDefinition::new(
        "Power",
        UnitClass::PowerKw,
        Some(StatePolicy::Instantaneous),
        Derivation::Field(&["power", "value"]),
        "mdi:flash",
    )
    .error_sentinels(&[-8388.608]);

    #[test]
    fn zero_suppression_only_applies_when_enabled() {
        let zero = StateValue::Number(0.0);
        assert!(!POWER.is_suppressed_zero(Some(&zero)));
        assert!(POWER.clone().suppress_zero().is_suppressed_zero(Some(&zero)));
        assert!(!POWER.clone().suppress_zero().is_suppressed_zero(Some(&StateValue::Number(0.1))));
        assert!(!POWER.clone().suppress_zero().is_suppressed_zero(None));
    }

    #[test]
    fn sentinel_match_is_exact() {
        assert!(POWER.is_error_sentinel(Some(&StateValue::Number(-8388.608))));
        assert!(!POWER.is_error_sentinel(Some(&StateValue::Number(-8388.6))));
        assert!(!POWER.is_error_sentinel(Some(&StateValue::Text("-8388.608".to_string()))));
    }

    #[test]
    fn interval_is_ignored_unless_periodic() {
        let odd = POWER.clone().resets_every(MeterInterval::Day);
        assert_eq!(odd.reset_interval(), None);
        assert!(!odd.descriptor("ABC", EntityOptions::default()).has_last_reset);
    }

    #[test]
    fn descriptor_carries_identity_and_options() {
        let d = POWER.descriptor(
            "1234567890AB",
            EntityOptions {
                force_update: true,
                visible_by_default: false,
            },
        );
        assert_eq!(d.unique_id, "1234567890ab_power");
        assert_eq!(d.device.name, "Glow Smart Meter 1234567890AB");
        assert!(d.force_update);
        assert!(!d.visible_by_default);
        assert_eq!(d.icon.as_deref(), Some("mdi:flash"));
    }
}
