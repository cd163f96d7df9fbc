//! The fixed set of measurements published for every Glow IHD.
//!
//! Payload shapes, as sent by IHD firmware 1.8.x:
//!
//! ```text
//! glow/<id>/STATE                   {"software":"v1.8.12","timestamp":"2022-06-11T20:54:53Z","hardware":"GLOW-IHD-01-1v4-SMETS2","han":{"rssi":-75,"status":"joined","lqi":100}}
//! glow/<id>/SENSOR/electricitymeter {"electricitymeter":{"timestamp":"2022-06-11T20:38:00Z","energy":{"export":{"cumulative":0.000},"import":{"cumulative":6613.405,"day":13.252,"week":141.710,"month":293.598,"price":{"unitrate":0.04998,"standingcharge":0.24030}}},"power":{"value":0.951}}}
//! glow/<id>/SENSOR/gasmeter         {"gasmeter":{"timestamp":"2022-06-11T20:53:52Z","energy":{"import":{"cumulative":17940.852,"day":11.128,"week":104.749,"month":217.122,"cumulativevol":1587.672,"dayvol":0.988,"weekvol":9.302,"monthvol":19.275,"price":{"unitrate":0.07320,"standingcharge":0.17850}}}}}
//! ```

use glow_entities::{StatePolicy, UnitClass};

use super::MeasurementDefinition;
use crate::{reset::MeterInterval, transform::Derivation};

const INFO: &str = "mdi:information-outline";
const SIGNAL: &str = "mdi:wifi-strength-outline";
const FLASH: &str = "mdi:flash";
const CASH: &str = "mdi:cash";
const FIRE: &str = "mdi:fire";

/// Instantaneous power value the IHD reports when its reading is faulty.
pub const POWER_ERROR_SENTINEL: f64 = -8388.608;

const MEASUREMENT: Option<StatePolicy> = Some(StatePolicy::Instantaneous);
const TOTAL_INCREASING: Option<StatePolicy> = Some(StatePolicy::MonotonicIncreasingTotal);
const TOTAL: Option<StatePolicy> = Some(StatePolicy::PeriodicTotal);

pub const STATE_MEASUREMENTS: &[MeasurementDefinition] = &[
    MeasurementDefinition::new(
        "Smart Meter IHD Software Version",
        UnitClass::None,
        None,
        Derivation::Field(&["software"]),
        INFO,
    )
    .diagnostic(),
    MeasurementDefinition::new(
        "Smart Meter IHD Hardware",
        UnitClass::None,
        None,
        Derivation::Field(&["hardware"]),
        INFO,
    )
    .diagnostic(),
    MeasurementDefinition::new(
        "Smart Meter IHD HAN Status",
        UnitClass::None,
        None,
        Derivation::Field(&["han", "status"]),
        INFO,
    )
    .diagnostic(),
    MeasurementDefinition::new(
        "Smart Meter IHD HAN RSSI",
        UnitClass::SignalStrengthDb,
        MEASUREMENT,
        Derivation::Field(&["han", "rssi"]),
        SIGNAL,
    )
    .diagnostic(),
    MeasurementDefinition::new(
        "Smart Meter IHD HAN LQI",
        UnitClass::None,
        MEASUREMENT,
        Derivation::Field(&["han", "lqi"]),
        SIGNAL,
    )
    .diagnostic(),
];

pub const ELECTRICITY_MEASUREMENTS: &[MeasurementDefinition] = &[
    MeasurementDefinition::new(
        "Smart Meter Electricity: Export",
        UnitClass::EnergyKwh,
        TOTAL_INCREASING,
        Derivation::Field(&["electricitymeter", "energy", "export", "cumulative"]),
        FLASH,
    ),
    MeasurementDefinition::new(
        "Smart Meter Electricity: Import",
        UnitClass::EnergyKwh,
        TOTAL_INCREASING,
        Derivation::Field(&["electricitymeter", "energy", "import", "cumulative"]),
        FLASH,
    )
    .suppress_zero(),
    MeasurementDefinition::new(
        "Smart Meter Electricity: Import (Today)",
        UnitClass::EnergyKwh,
        TOTAL_INCREASING,
        Derivation::Field(&["electricitymeter", "energy", "import", "day"]),
        FLASH,
    ),
    MeasurementDefinition::new(
        "Smart Meter Electricity: Import (This week)",
        UnitClass::EnergyKwh,
        TOTAL_INCREASING,
        Derivation::Field(&["electricitymeter", "energy", "import", "week"]),
        FLASH,
    ),
    MeasurementDefinition::new(
        "Smart Meter Electricity: Import (This month)",
        UnitClass::EnergyKwh,
        TOTAL_INCREASING,
        Derivation::Field(&["electricitymeter", "energy", "import", "month"]),
        FLASH,
    ),
    MeasurementDefinition::new(
        "Smart Meter Electricity: Import Unit Rate",
        UnitClass::MonetaryGbpPerKwh,
        TOTAL,
        Derivation::Field(&["electricitymeter", "energy", "import", "price", "unitrate"]),
        CASH,
    )
    .suppress_zero(),
    MeasurementDefinition::new(
        "Smart Meter Electricity: Import Standing Charge",
        UnitClass::MonetaryGbp,
        TOTAL,
        Derivation::Field(&["electricitymeter", "energy", "import", "price", "standingcharge"]),
        CASH,
    )
    .suppress_zero(),
    MeasurementDefinition::new(
        "Smart Meter Electricity: Power",
        UnitClass::PowerKw,
        MEASUREMENT,
        Derivation::Field(&["electricitymeter", "power", "value"]),
        FLASH,
    )
    .error_sentinels(&[POWER_ERROR_SENTINEL]),
    MeasurementDefinition::new(
        "Smart Meter Electricity: Cost (Today)",
        UnitClass::MonetaryGbp,
        TOTAL,
        Derivation::DailyCost {
            meter: "electricitymeter",
            nulls_as_zero: false,
        },
        CASH,
    )
    .resets_every(MeterInterval::Day),
];

// Gas power was dropped from IHD firmware 1.8.13 and is not published.
pub const GAS_MEASUREMENTS: &[MeasurementDefinition] = &[
    MeasurementDefinition::new(
        "Smart Meter Gas: Import",
        UnitClass::EnergyKwh,
        TOTAL_INCREASING,
        Derivation::Field(&["gasmeter", "energy", "import", "cumulative"]),
        FIRE,
    )
    .suppress_zero(),
    MeasurementDefinition::new(
        "Smart Meter Gas: Import Vol",
        UnitClass::VolumeM3,
        TOTAL_INCREASING,
        Derivation::Field(&["gasmeter", "energy", "import", "cumulativevol"]),
        FIRE,
    )
    .suppress_zero(),
    MeasurementDefinition::new(
        "Smart Meter Gas: Import Vol (Today)",
        UnitClass::VolumeM3,
        TOTAL_INCREASING,
        Derivation::Field(&["gasmeter", "energy", "import", "dayvol"]),
        FIRE,
    ),
    MeasurementDefinition::new(
        "Smart Meter Gas: Import Vol (This week)",
        UnitClass::VolumeM3,
        TOTAL_INCREASING,
        Derivation::Field(&["gasmeter", "energy", "import", "weekvol"]),
        FIRE,
    ),
    MeasurementDefinition::new(
        "Smart Meter Gas: Import Vol (This month)",
        UnitClass::VolumeM3,
        TOTAL_INCREASING,
        Derivation::Field(&["gasmeter", "energy", "import", "monthvol"]),
        FIRE,
    ),
    MeasurementDefinition::new(
        "Smart Meter Gas: Import (Today)",
        UnitClass::EnergyKwh,
        TOTAL_INCREASING,
        Derivation::Field(&["gasmeter", "energy", "import", "day"]),
        FIRE,
    ),
    MeasurementDefinition::new(
        "Smart Meter Gas: Import (This week)",
        UnitClass::EnergyKwh,
        TOTAL_INCREASING,
        Derivation::Field(&["gasmeter", "energy", "import", "week"]),
        FIRE,
    ),
    MeasurementDefinition::new(
        "Smart Meter Gas: Import (This month)",
        UnitClass::EnergyKwh,
        TOTAL_INCREASING,
        Derivation::Field(&["gasmeter", "energy", "import", "month"]),
        FIRE,
    ),
    MeasurementDefinition::new(
        "Smart Meter Gas: Import Unit Rate",
        UnitClass::MonetaryGbpPerKwh,
        TOTAL,
        Derivation::Field(&["gasmeter", "energy", "import", "price", "unitrate"]),
        CASH,
    )
    .suppress_zero(),
    MeasurementDefinition::new(
        "Smart Meter Gas: Import Standing Charge",
        UnitClass::MonetaryGbp,
        TOTAL,
        Derivation::Field(&["gasmeter", "energy", "import", "price", "standingcharge"]),
        CASH,
    )
    .suppress_zero(),
    MeasurementDefinition::new(
        "Smart Meter Gas: Cost (Today)",
        UnitClass::MonetaryGbp,
        TOTAL,
        Derivation::DailyCost {
            meter: "gasmeter",
            nulls_as_zero: true,
        },
        CASH,
    )
    .resets_every(MeterInterval::Day),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique_within_each_group() {
        for group in [STATE_MEASUREMENTS, ELECTRICITY_MEASUREMENTS, GAS_MEASUREMENTS] {
            let names: HashSet<_> = group.iter().map(|d| d.name).collect();
            assert_eq!(names.len(), group.len());
        }
    }

    #[test]
    fn intervals_only_on_periodic_totals() {
        let all = STATE_MEASUREMENTS
            .iter()
            .chain(ELECTRICITY_MEASUREMENTS)
            .chain(GAS_MEASUREMENTS);
        for d in all {
            if d.interval.is_some() {
                assert_eq!(d.state_policy, TOTAL, "{} has an interval", d.name);
            }
        }
    }

    #[test]
    fn only_power_has_sentinels() {
        let with_sentinels: Vec<_> = ELECTRICITY_MEASUREMENTS
            .iter()
            .chain(GAS_MEASUREMENTS)
            .chain(STATE_MEASUREMENTS)
            .filter(|d| !d.error_sentinels.is_empty())
            .map(|d| d.name)
            .collect();
        assert_eq!(with_sentinels, vec!["Smart Meter Electricity: Power"]);
    }
}
