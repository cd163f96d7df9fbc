use time::OffsetDateTime;

use super::DeviceInfo;

/// Unit a measurement is reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum UnitClass {
    EnergyKwh,
    PowerKw,
    MonetaryGbp,
    MonetaryGbpPerKwh,
    VolumeM3,
    SignalStrengthDb,
    RatioPercent,
    None,
}

impl UnitClass {
    /// Unit string shown next to the value.
    pub fn unit(&self) -> Option<&'static str> {
        match self {
            Self::EnergyKwh => Some("kWh"),
            Self::PowerKw => Some("kW"),
            Self::MonetaryGbp => Some("GBP"),
            Self::MonetaryGbpPerKwh => Some("GBP/kWh"),
            Self::VolumeM3 => Some("m³"),
            Self::SignalStrengthDb => Some("dB"),
            Self::RatioPercent => Some("%"),
            Self::None => None,
        }
    }

    /// Host-platform device class implied by the unit.
    ///
    /// Volumes are only ever reported for gas, so `m³` maps to `gas`.
    pub fn device_class(&self) -> Option<&'static str> {
        match self {
            Self::EnergyKwh => Some("energy"),
            Self::PowerKw => Some("power"),
            Self::MonetaryGbp | Self::MonetaryGbpPerKwh => Some("monetary"),
            Self::VolumeM3 => Some("gas"),
            Self::SignalStrengthDb => Some("signal_strength"),
            Self::RatioPercent | Self::None => None,
        }
    }
}

/// How the host should aggregate successive values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StatePolicy {
    /// A reading of the present moment (power, signal strength).
    #[cfg_attr(feature = "serde", serde(rename = "measurement"))]
    Instantaneous,
    /// A total that only grows, apart from meter-side resets.
    #[cfg_attr(feature = "serde", serde(rename = "total_increasing"))]
    MonotonicIncreasingTotal,
    /// A total that may move either way or restart on a calendar boundary.
    #[cfg_attr(feature = "serde", serde(rename = "total"))]
    PeriodicTotal,
}

impl StatePolicy {
    pub fn state_class(&self) -> &'static str {
        match self {
            Self::Instantaneous => "measurement",
            Self::MonotonicIncreasingTotal => "total_increasing",
            Self::PeriodicTotal => "total",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EntityCategory {
    Diagnostic,
    Config,
}

impl EntityCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Diagnostic => "diagnostic",
            Self::Config => "config",
        }
    }
}

/// A known value. "Unknown" is represented by `None` at the use site.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum StateValue {
    Number(f64),
    Text(String),
}

impl StateValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

/// Static description of an entity, sent once when a device is first seen.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityDescriptor {
    pub unique_id: String,
    pub name: String,
    pub device_id: String,
    pub unit: UnitClass,
    pub state_policy: Option<StatePolicy>,
    pub category: Option<EntityCategory>,
    pub icon: Option<String>,
    /// True when states of this entity carry a `last_reset` instant.
    pub has_last_reset: bool,
    pub force_update: bool,
    pub visible_by_default: bool,
    pub device: DeviceInfo,
}

/// Latest state of one entity.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityState {
    pub unique_id: String,
    /// Exposed to the host as the `device_id` extra attribute.
    pub device_id: String,
    pub value: Option<StateValue>,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339::option"))]
    pub last_reset: Option<OffsetDateTime>,
}
