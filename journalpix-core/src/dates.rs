use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime, TimeZone, Timelike};
use std::time::SystemTime;

/// Layout of the capture time printed after `- Added` (e.g. `05 Jan 2020 09:15 AM`).
pub const ADDED_FORMAT: &str = "%d %b %Y %I:%M %p";

/// Parses a capture time in the fixed [`ADDED_FORMAT`] layout.
///
/// # Examples
///
/// ```
/// # use chrono::{NaiveDate, NaiveTime};
/// # use journalpix_core::dates::parse_added_timestamp;
/// let taken = parse_added_timestamp("05 Jan 2020 09:15 PM").unwrap();
///
/// assert_eq!(taken.date(), NaiveDate::from_ymd_opt(2020, 1, 5).unwrap());
/// assert_eq!(taken.time(), NaiveTime::from_hms_opt(21, 15, 0).unwrap());
/// ```
pub fn parse_added_timestamp(input: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(input.trim(), ADDED_FORMAT)
        .with_context(|| format!("'{input}' does not match the '{ADDED_FORMAT}' layout"))
}

/// Drops seconds and sub-second precision.
pub fn truncate_to_minute(date_time: NaiveDateTime) -> NaiveDateTime {
    date_time
        .with_second(0)
        .and_then(|dt| dt.with_nanosecond(0))
        .unwrap_or(date_time)
}

/// Interprets `date_time` as local wall-clock time, the way `touch -t` does.
///
/// Ambiguous times (DST fold) resolve to the earlier instant. Times that do
/// not exist locally (DST gap) are an error.
pub fn to_system_time(date_time: NaiveDateTime) -> Result<SystemTime> {
    let local = Local
        .from_local_datetime(&truncate_to_minute(date_time))
        .earliest()
        .with_context(|| format!("{date_time} does not exist in the local time zone"))?;
    Ok(SystemTime::from(local))
}
