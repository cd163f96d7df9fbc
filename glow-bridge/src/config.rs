use serde::Deserialize;
use std::{fs, path::PathBuf};

use crate::{
    dispatcher::DeviceFilter,
    host::{parse_time_zone, HostTimeZone},
    registry::RegistryConfig,
};

pub const DEFAULT_TOPIC_PREFIX: &str = "glow";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid time zone '{value}' for bridge.{field}")]
    InvalidTimeZone { field: &'static str, value: String },
    #[error("source kind 'capture' requires source.path")]
    MissingCapturePath,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Device to publish entities for, or `+` for every device on the broker.
    pub device_id: String,
    pub topic_prefix: String,
    pub time_zone_electricity: Option<String>,
    pub time_zone_gas: Option<String>,
    pub host_time_zone: Option<String>,
    pub force_update: bool,
    pub hide_gas_sensors: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            device_id: DeviceFilter::WILDCARD.to_string(),
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
            time_zone_electricity: None,
            time_zone_gas: None,
            host_time_zone: None,
            force_update: false,
            hide_gas_sensors: false,
        }
    }
}

impl BridgeConfig {
    pub fn device_filter(&self) -> DeviceFilter {
        DeviceFilter::parse(&self.device_id)
    }

    /// Prefix without wildcards, spaces or trailing separators.
    pub fn topic_prefix(&self) -> String {
        let prefix: String = self
            .topic_prefix
            .chars()
            .filter(|c| *c != '#' && !c.is_whitespace())
            .collect();
        let prefix = prefix.trim_end_matches('/');

        if prefix.is_empty() {
            DEFAULT_TOPIC_PREFIX.to_string()
        } else {
            prefix.to_string()
        }
    }

    pub fn registry_config(&self) -> Result<RegistryConfig, ConfigError> {
        Ok(RegistryConfig {
            time_zone_electricity: zone("time_zone_electricity", &self.time_zone_electricity)?,
            time_zone_gas: zone("time_zone_gas", &self.time_zone_gas)?,
            host: HostTimeZone::new(zone("host_time_zone", &self.host_time_zone)?),
            force_update: self.force_update,
            hide_gas_sensors: self.hide_gas_sensors,
        })
    }
}

fn zone(field: &'static str, value: &Option<String>) -> Result<Option<chrono_tz::Tz>, ConfigError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(name) => parse_time_zone(name).map(Some).map_err(|_| ConfigError::InvalidTimeZone {
            field,
            value: name.to_string(),
        }),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Lines of `<topic> <payload>`, as printed by `mosquitto_sub -v`.
    #[default]
    MosquittoSub,
    /// NDJSON capture of `{"topic": ..., "payload": ...}` records.
    Capture,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Absent means stdin.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    #[default]
    Ndjson,
    Log,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: SinkKind,
    /// Absent means stdout.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bridge: BridgeConfig,
    pub source: SourceConfig,
    pub sink: SinkConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("GLOW_BRIDGE_CONFIG").unwrap_or_else(|_| "glow-bridge.toml".to_string());
        let contents = fs::read_to_string(&path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bridge.registry_config()?;
        if self.source.kind == SourceKind::Capture && self.source.path.is_none() {
            return Err(ConfigError::MissingCapturePath);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = AppConfig::from_toml("").unwrap();

        assert_eq!(cfg.bridge.device_filter(), DeviceFilter::AnyDevice);
        assert_eq!(cfg.bridge.topic_prefix(), "glow");
        assert_eq!(cfg.source.kind, SourceKind::MosquittoSub);
        assert_eq!(cfg.sink.kind, SinkKind::Ndjson);
        assert!(cfg.metrics.is_none());
    }

    #[test]
    fn full_file_is_parsed_and_normalized() {
        let cfg = AppConfig::from_toml(
            r#"
            [bridge]
            device_id = " 12:34:56:78:90:ab "
            topic_prefix = "home/glow/#"
            time_zone_electricity = "Europe/London"
            host_time_zone = "America/Sao_Paulo"
            hide_gas_sensors = true

            [source]
            kind = "capture"
            path = "capture.ndjson"

            [sink]
            kind = "log"

            [metrics]
            bind_addr = "127.0.0.1:9184"
            "#,
        )
        .unwrap();

        assert_eq!(
            cfg.bridge.device_filter(),
            DeviceFilter::Exact("1234567890AB".to_string())
        );
        assert_eq!(cfg.bridge.topic_prefix(), "home/glow");

        let registry = cfg.bridge.registry_config().unwrap();
        assert_eq!(registry.time_zone_electricity, Some(chrono_tz::Europe::London));
        assert_eq!(registry.time_zone_gas, None);
        assert_eq!(registry.host.get(), Some(chrono_tz::America::Sao_Paulo));
        assert!(registry.hide_gas_sensors);
        assert!(!registry.force_update);

        assert_eq!(cfg.source.kind, SourceKind::Capture);
        assert_eq!(cfg.sink.kind, SinkKind::Log);
        assert_eq!(cfg.metrics.unwrap().bind_addr, "127.0.0.1:9184");
    }

    #[test]
    fn blank_prefix_falls_back_to_default() {
        let bridge = BridgeConfig {
            topic_prefix: " # ".to_string(),
            ..BridgeConfig::default()
        };
        assert_eq!(bridge.topic_prefix(), DEFAULT_TOPIC_PREFIX);
    }

    #[test]
    fn unknown_time_zone_is_a_config_error() {
        let bridge = BridgeConfig {
            time_zone_gas: Some("Europe/Atlantis".to_string()),
            ..BridgeConfig::default()
        };
        assert_eq!(
            bridge.registry_config().unwrap_err(),
            ConfigError::InvalidTimeZone {
                field: "time_zone_gas",
                value: "Europe/Atlantis".to_string(),
            }
        );
        assert!(AppConfig::from_toml("[bridge]\ntime_zone_gas = \"Europe/Atlantis\"").is_err());
    }

    #[test]
    fn capture_source_requires_a_path() {
        let err = AppConfig::from_toml("[source]\nkind = \"capture\"").unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::MissingCapturePath)
        );
    }
}
