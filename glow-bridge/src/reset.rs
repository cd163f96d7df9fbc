//! Start-of-interval ("last reset") instants for periodic totals.
//!
//! The IHD resets its day/week/month totals at local midnight of the meter's
//! time zone. Boundaries are computed on the local calendar and converted
//! back through the zone's rules at that local instant, so the UTC offset
//! used is the one in force at the boundary, not at the message.

use chrono::{Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::Value;
use time::{
    format_description::well_known::{Iso8601, Rfc3339},
    OffsetDateTime,
};

use crate::error::BridgeError;

/// Calendar window a periodic total accumulates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeterInterval {
    Day,
    Week,
    Month,
    Year,
}

/// Keys checked, in order, for the instant a message was produced.
const TIMESTAMP_PATHS: [&[&str]; 3] = [
    &["timestamp"],
    &["electricitymeter", "timestamp"],
    &["gasmeter", "timestamp"],
];

/// Extract the message's own timestamp.
///
/// The top-level `timestamp` wins over the meter-specific one. Absence of
/// every candidate is an error; there is no fallback to the current time.
pub fn message_timestamp(payload: &Value) -> Result<OffsetDateTime, BridgeError> {
    let raw = TIMESTAMP_PATHS
        .iter()
        .find_map(|path| {
            path.iter()
                .try_fold(payload, |cur, key| cur.get(key))
                .and_then(Value::as_str)
        })
        .ok_or_else(|| BridgeError::InvalidTimestamp("no timestamp field in payload".to_string()))?;

    OffsetDateTime::parse(raw, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(raw, &Iso8601::DEFAULT))
        .map_err(|e| BridgeError::InvalidTimestamp(format!("'{raw}': {e}")))
}

/// UTC instant at which the interval containing `at` started in `zone`.
pub fn reset_boundary(
    at: OffsetDateTime,
    zone: Tz,
    interval: MeterInterval,
) -> Result<OffsetDateTime, BridgeError> {
    let utc = Utc
        .timestamp_opt(at.unix_timestamp(), at.nanosecond())
        .single()
        .ok_or_else(|| BridgeError::InvalidTimestamp(format!("{at} is out of range")))?;
    let local_date = utc.with_timezone(&zone).date_naive();

    let boundary_date = interval_start(local_date, interval)
        .ok_or_else(|| BridgeError::InvalidTimestamp(format!("no {interval:?} start for {local_date}")))?;
    let local_midnight = boundary_date.and_time(NaiveTime::MIN);

    let instant = resolve_local(zone, local_midnight)
        .ok_or_else(|| BridgeError::InvalidTimestamp(format!("{local_midnight} has no instant in {zone}")))?;

    OffsetDateTime::from_unix_timestamp(instant.timestamp())
        .map_err(|e| BridgeError::InvalidTimestamp(e.to_string()))
}

fn interval_start(date: NaiveDate, interval: MeterInterval) -> Option<NaiveDate> {
    match interval {
        MeterInterval::Day => Some(date),
        MeterInterval::Week => {
            date.checked_sub_signed(Duration::days(i64::from(date.weekday().num_days_from_monday())))
        }
        MeterInterval::Month => date.with_day(1),
        MeterInterval::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1),
    }
}

/// Map a local wall-clock time to an instant.
///
/// An ambiguous time takes the earlier instant. A time skipped by a
/// transition is read with the offset in force just before it, which lands
/// on the first valid local time after the gap.
fn resolve_local(zone: Tz, local: NaiveDateTime) -> Option<chrono::DateTime<Tz>> {
    match zone.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => {
            let lead = Duration::hours(3);
            let before = local.checked_sub_signed(lead)?;
            zone.from_local_datetime(&before)
                .earliest()
                .and_then(|dt| dt.checked_add_signed(lead))
        }
    }
}
