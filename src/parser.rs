/// Payload classification and derived-metric computation
use log::debug;
use thiserror::Error;

use crate::models::{RainfallReading, RainfallTracker, Reading, WaterLevelReading};

/// Which device a raw payload came from, judged by field count alone.
///
/// Field values are not inspected here; a payload can classify cleanly and
/// still fail numeric parsing downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSchema {
    DeviceOne,
    DeviceRainfall,
    Unrecognized,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unexpected data format: expected 3 or 7 fields, got {count}")]
    UnknownSchema { count: usize },
    #[error("invalid {field} value: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

/// Classify a raw comma-delimited payload by its field count.
///
/// 3 fields is the water-level sensor, 7 fields is the rainfall sensor,
/// anything else is unrecognized. Pure function, no side effects.
pub fn classify(raw: &str) -> DeviceSchema {
    match raw.split(',').count() {
        3 => DeviceSchema::DeviceOne,
        7 => DeviceSchema::DeviceRainfall,
        _ => DeviceSchema::Unrecognized,
    }
}

fn parse_f64(field: &'static str, token: &str) -> Result<f64, ParseError> {
    token.trim().parse().map_err(|_| ParseError::InvalidField {
        field,
        value: token.to_string(),
    })
}

fn parse_i32(field: &'static str, token: &str) -> Result<i32, ParseError> {
    token.trim().parse().map_err(|_| ParseError::InvalidField {
        field,
        value: token.to_string(),
    })
}

/// Normalize a 3-field water-level payload.
///
/// Payload layout is `identifier,distance,battery_voltage`; the identifier is
/// not used. The level is the mount offset minus the measured echo distance,
/// deliberately unclamped in both directions.
///
/// # Arguments
/// * `values` - the 3 payload fields
/// * `sensor_offset_cm` - distance from the sensor mount down to the creek bed
///
/// # Returns
/// The water-level reading, or a ParseError naming the bad field
pub fn parse_water_level(
    values: &[&str],
    sensor_offset_cm: f64,
) -> Result<WaterLevelReading, ParseError> {
    let distance = parse_f64("distance", values[1])?;
    let battery_voltage = parse_f64("battery_voltage", values[2])?;

    Ok(WaterLevelReading {
        water_level_cm: sensor_offset_cm - distance,
        battery_voltage,
    })
}

/// Normalize a 7-field rainfall payload against the carried rolling state.
///
/// Payload layout is `identifier,reserved,sensor_on_time,reserved,
/// daily_rainfall,raw_bucket_tips,battery_voltage`; the identifier and the
/// two reserved fields are transmitter-internal and passed over untouched.
///
/// The device reports a cumulative daily total, so the incremental rainfall
/// is the difference from the previous cycle's total. Two resets complicate
/// that:
/// - sensor_on_time going backwards means the transmitter rebooted and its
///   daily counter restarted, so the whole reported total is new rain.
/// - a change in the local hour-of-day closes out the hourly accumulation
///   and restarts it from the current increment.
///
/// The reported increment is clamped to zero before it feeds the hourly
/// total, so a transient negative delta contributes nothing.
///
/// # Arguments
/// * `values` - the 7 payload fields
/// * `state` - rolling state from the previous successful cycle
/// * `current_hour` - hour-of-day from the station clock, 0-23
///
/// # Returns
/// The rainfall reading and the successor state, or a ParseError; on error
/// the caller must keep the old state.
pub fn parse_rainfall(
    values: &[&str],
    state: &RainfallTracker,
    current_hour: u32,
) -> Result<(RainfallReading, RainfallTracker), ParseError> {
    let sensor_on_time = parse_f64("sensor_on_time", values[2])?;
    let daily_rainfall = parse_f64("daily_rainfall", values[4])?;
    let raw_bucket_tips = parse_i32("raw_bucket_tips", values[5])?;
    let battery_voltage = parse_f64("battery_voltage", values[6])?;

    let raw_delta = if sensor_on_time < state.sensor_on_time {
        // Reboot detected: the daily counter restarted from zero
        daily_rainfall
    } else {
        daily_rainfall - state.daily_rainfall
    };
    let five_minute_rainfall = raw_delta.max(0.0);

    let hourly_rainfall = if current_hour != state.hour_of_day {
        // Hour boundary: discard the previous hour's accumulation
        five_minute_rainfall
    } else {
        state.hourly_rainfall + five_minute_rainfall
    };

    let reading = RainfallReading {
        sensor_on_time,
        hourly_rainfall,
        daily_rainfall,
        five_minute_rainfall,
        raw_bucket_tips,
        battery_voltage,
    };
    let next_state = RainfallTracker {
        daily_rainfall,
        sensor_on_time,
        hourly_rainfall,
        hour_of_day: current_hour,
    };

    Ok((reading, next_state))
}

/// Parse one raw transmission into a tagged reading.
///
/// Returns the reading plus, for the rainfall device, the successor rolling
/// state. Water-level payloads carry no state, so the second element is None
/// and the caller's tracker stays as-is.
pub fn parse_transmission(
    raw: &str,
    state: &RainfallTracker,
    current_hour: u32,
    sensor_offset_cm: f64,
) -> Result<(Reading, Option<RainfallTracker>), ParseError> {
    let values: Vec<&str> = raw.split(',').collect();

    match classify(raw) {
        DeviceSchema::DeviceOne => {
            let reading = parse_water_level(&values, sensor_offset_cm)?;
            debug!("Parsed device 1 values: {:?}", reading);
            Ok((Reading::WaterLevel(reading), None))
        }
        DeviceSchema::DeviceRainfall => {
            let (reading, next_state) = parse_rainfall(&values, state, current_hour)?;
            debug!("Parsed device 2 values: {:?}", reading);
            Ok((Reading::Rainfall(reading), Some(next_state)))
        }
        DeviceSchema::Unrecognized => Err(ParseError::UnknownSchema {
            count: values.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFSET_CM: f64 = 600.0;

    fn tracker(
        daily_rainfall: f64,
        sensor_on_time: f64,
        hourly_rainfall: f64,
        hour_of_day: u32,
    ) -> RainfallTracker {
        RainfallTracker {
            daily_rainfall,
            sensor_on_time,
            hourly_rainfall,
            hour_of_day,
        }
    }

    fn parse_rainfall_str(
        raw: &str,
        state: &RainfallTracker,
        current_hour: u32,
    ) -> (RainfallReading, RainfallTracker) {
        let values: Vec<&str> = raw.split(',').collect();
        parse_rainfall(&values, state, current_hour).expect("payload should parse")
    }

    #[test]
    fn classifies_by_field_count_only() {
        assert_eq!(classify("dev1,150.0,3.7"), DeviceSchema::DeviceOne);
        assert_eq!(
            classify("dev2,0,120.0,0,12.0,48,3.9"),
            DeviceSchema::DeviceRainfall
        );

        // Field values are irrelevant at this stage
        assert_eq!(classify("a,b,c"), DeviceSchema::DeviceOne);

        assert_eq!(classify(""), DeviceSchema::Unrecognized);
        assert_eq!(classify("dev1"), DeviceSchema::Unrecognized);
        assert_eq!(classify("dev1,150.0"), DeviceSchema::Unrecognized);
        assert_eq!(classify("a,b,c,d,e"), DeviceSchema::Unrecognized);
        assert_eq!(classify("a,b,c,d,e,f,g,h"), DeviceSchema::Unrecognized);
    }

    #[test]
    fn classification_is_idempotent() {
        let raw = "dev2,0,120.0,0,12.0,48,3.9";
        assert_eq!(classify(raw), classify(raw));
    }

    #[test]
    fn unrecognized_payload_produces_no_reading() {
        let state = tracker(10.0, 100.0, 1.0, 14);
        let result = parse_transmission("a,b,c,d,e", &state, 14, OFFSET_CM);
        assert_eq!(result, Err(ParseError::UnknownSchema { count: 5 }));
    }

    #[test]
    fn water_level_is_offset_minus_distance() {
        let state = tracker(0.0, 0.0, 0.0, 0);
        let (reading, next_state) =
            parse_transmission("dev1,150.0,3.7", &state, 0, OFFSET_CM).unwrap();

        assert_eq!(
            reading,
            Reading::WaterLevel(WaterLevelReading {
                water_level_cm: 450.0,
                battery_voltage: 3.7,
            })
        );
        // Water-level payloads never touch the rainfall state
        assert_eq!(next_state, None);
    }

    #[test]
    fn water_level_passes_through_unclamped() {
        // Creek above the sensor mount: negative level is valid
        let flood = parse_water_level(&["dev1", "650.0", "3.7"], OFFSET_CM).unwrap();
        assert_eq!(flood.water_level_cm, -50.0);

        // Echo distance beyond the configured offset is equally valid
        let dry = parse_water_level(&["dev1", "-25.0", "3.7"], OFFSET_CM).unwrap();
        assert_eq!(dry.water_level_cm, 625.0);
    }

    #[test]
    fn water_level_rejects_non_numeric_fields() {
        assert_eq!(
            parse_water_level(&["dev1", "abc", "3.7"], OFFSET_CM),
            Err(ParseError::InvalidField {
                field: "distance",
                value: "abc".to_string(),
            })
        );
        assert_eq!(
            parse_water_level(&["dev1", "150.0", "low"], OFFSET_CM),
            Err(ParseError::InvalidField {
                field: "battery_voltage",
                value: "low".to_string(),
            })
        );
    }

    #[test]
    fn rainfall_normal_accumulation() {
        let state = tracker(10.0, 100.0, 0.0, 14);
        let (reading, _) = parse_rainfall_str("dev2,0,120.0,0,10.5,42,3.9", &state, 14);
        assert_eq!(reading.five_minute_rainfall, 0.5);
    }

    #[test]
    fn rainfall_reboot_takes_whole_daily_total() {
        // sensor_on_time went backwards, so the daily counter restarted
        let state = tracker(10.0, 100.0, 1.0, 14);
        let (reading, next_state) = parse_rainfall_str("dev2,0,5.0,0,12.0,48,3.9", &state, 14);

        assert_eq!(reading.five_minute_rainfall, 12.0);
        assert_eq!(next_state.sensor_on_time, 5.0);
        assert_eq!(next_state.daily_rainfall, 12.0);
    }

    #[test]
    fn rainfall_negative_delta_clamps_to_zero() {
        // Daily total went down without a reboot marker
        let state = tracker(10.0, 100.0, 2.0, 14);
        let (reading, next_state) = parse_rainfall_str("dev2,0,120.0,0,9.5,40,3.9", &state, 14);

        assert_eq!(reading.five_minute_rainfall, 0.0);
        // The clamped value feeds the hourly total, so it is unchanged
        assert_eq!(reading.hourly_rainfall, 2.0);
        assert_eq!(next_state.hourly_rainfall, 2.0);
        assert_eq!(next_state.daily_rainfall, 9.5);
    }

    #[test]
    fn rainfall_hour_rollover_discards_accumulation() {
        let state = tracker(10.0, 100.0, 5.0, 13);
        let (reading, next_state) = parse_rainfall_str("dev2,0,120.0,0,10.5,42,3.9", &state, 14);

        assert_eq!(reading.five_minute_rainfall, 0.5);
        assert_eq!(reading.hourly_rainfall, 0.5);
        assert_eq!(next_state.hour_of_day, 14);
    }

    #[test]
    fn rainfall_same_hour_accumulates() {
        let state = tracker(10.0, 100.0, 2.0, 14);
        let (reading, _) = parse_rainfall_str("dev2,0,120.0,0,10.5,42,3.9", &state, 14);

        assert_eq!(reading.five_minute_rainfall, 0.5);
        assert_eq!(reading.hourly_rainfall, 2.5);
    }

    #[test]
    fn rainfall_full_cycle() {
        let state = tracker(10.0, 100.0, 1.0, 16);
        let (reading, next_state) = parse_rainfall_str("dev2,0,120.0,0,12.0,48,3.9", &state, 16);

        assert_eq!(
            reading,
            RainfallReading {
                sensor_on_time: 120.0,
                hourly_rainfall: 3.0,
                daily_rainfall: 12.0,
                five_minute_rainfall: 2.0,
                raw_bucket_tips: 48,
                battery_voltage: 3.9,
            }
        );
        assert_eq!(next_state, tracker(12.0, 120.0, 3.0, 16));
    }

    #[test]
    fn rainfall_rejects_non_numeric_fields() {
        let state = tracker(10.0, 100.0, 1.0, 14);

        let bad_tips: Vec<&str> = "dev2,0,120.0,0,12.0,4.8,3.9".split(',').collect();
        assert_eq!(
            parse_rainfall(&bad_tips, &state, 14),
            Err(ParseError::InvalidField {
                field: "raw_bucket_tips",
                value: "4.8".to_string(),
            })
        );

        let bad_on_time: Vec<&str> = "dev2,0,?,0,12.0,48,3.9".split(',').collect();
        assert_eq!(
            parse_rainfall(&bad_on_time, &state, 14),
            Err(ParseError::InvalidField {
                field: "sensor_on_time",
                value: "?".to_string(),
            })
        );
    }

    #[test]
    fn failed_parse_returns_no_successor_state() {
        let state = tracker(10.0, 100.0, 1.0, 14);
        let result = parse_transmission("dev2,0,120.0,0,wet,48,3.9", &state, 14, OFFSET_CM);
        assert!(result.is_err());
        // The caller keeps `state` untouched on Err; nothing to roll back
        assert_eq!(state, tracker(10.0, 100.0, 1.0, 14));
    }

    #[test]
    fn reserved_fields_are_ignored() {
        let state = tracker(10.0, 100.0, 1.0, 14);
        let (with_zeros, _) = parse_rainfall_str("dev2,0,120.0,0,12.0,48,3.9", &state, 14);
        let (with_junk, _) = parse_rainfall_str("dev2,xx,120.0,yy,12.0,48,3.9", &state, 14);
        assert_eq!(with_zeros, with_junk);
    }
}
