use std::sync::Arc;

use chrono_tz::Tz;
use parking_lot::RwLock;

use crate::error::BridgeError;

/// The host platform's local time zone, shared by every measurement.
///
/// Read on each reset-boundary computation, so a change made through
/// [`HostTimeZone::set`] applies from the next message onward.
#[derive(Debug, Clone, Default)]
pub struct HostTimeZone {
    inner: Arc<RwLock<Option<Tz>>>,
}

impl HostTimeZone {
    pub fn new(zone: Option<Tz>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(zone)),
        }
    }

    pub fn get(&self) -> Option<Tz> {
        *self.inner.read()
    }

    pub fn set(&self, zone: Option<Tz>) {
        *self.inner.write() = zone;
    }

    pub fn set_named(&self, name: &str) -> Result<(), BridgeError> {
        self.set(Some(parse_time_zone(name)?));
        Ok(())
    }
}

/// Parse an IANA zone id such as `Europe/London`.
pub fn parse_time_zone(name: &str) -> Result<Tz, BridgeError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| BridgeError::InvalidTimeZone(name.to_string()))
}
