//! Timestamp utilities
//!
//! Penetrometers stamp each acquisition with a naive local time. All of them are
//! operated in Japan, so the naive value is interpreted in Asia/Tokyo and stored
//! as RFC 3339 text carrying the +09:00 offset.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;

use crate::{Error, Result};

/// Timezone the device clocks are set to
pub const ACQUISITION_TZ: Tz = chrono_tz::Asia::Tokyo;

/// Device header datetime format, e.g. `23.07.01 12:34:56`
pub const DEVICE_DATETIME_FORMAT: &str = "%y.%m.%d %H:%M:%S";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse a device header datetime in the acquisition timezone
pub fn parse_device_datetime(value: &str) -> Result<DateTime<FixedOffset>> {
    let naive = NaiveDateTime::parse_from_str(value.trim(), DEVICE_DATETIME_FORMAT)
        .map_err(|e| Error::Timestamp(format!("unexpected datetime '{}': {}", value.trim(), e)))?;

    ACQUISITION_TZ
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| Error::Timestamp(format!("ambiguous local datetime: {}", value.trim())))
}

/// Render a timestamp the way it is stored in the database
pub fn to_storage(dt: &DateTime<FixedOffset>) -> String {
    dt.with_timezone(&ACQUISITION_TZ)
        .to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Parse a stored timestamp
pub fn from_storage(value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value)
        .map_err(|e| Error::Timestamp(format!("bad stored timestamp '{}': {}", value, e)))
}

/// Format a sampling date for file names (`YYYYMMDD`)
pub fn compact_date(date: &NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}
