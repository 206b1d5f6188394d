/// Station clock helpers
use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Pacific::Auckland;
use chrono_tz::Tz;

/// Hour-boundary decisions and stored timestamps all use the station's civil
/// timezone (NZST/NZDT), not UTC.
pub const STATION_TZ: Tz = Auckland;

/// Current wall-clock time at the station.
pub fn now_station() -> DateTime<Tz> {
    Utc::now().with_timezone(&STATION_TZ)
}

/// Current hour-of-day (0-23) at the station, used for the hourly
/// rainfall rollover.
pub fn current_hour() -> u32 {
    now_station().hour()
}

/// Format a timestamp for human-readable logging
///
/// Converts a station-local DateTime to DD.MM.YYYY - HH:MM:SS format.
pub fn format_datetime(dt: &DateTime<Tz>) -> String {
    dt.format("%d.%m.%Y - %H:%M:%S").to_string()
}
