/// A water-level observation from the ultrasonic sensor (device 1).
///
/// `water_level_cm` is the derived creek level, not the raw echo distance.
/// It may be negative when the creek has risen above the sensor mount, or
/// exceed the mount offset when the bed is drier than expected; both are
/// valid and stored as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterLevelReading {
    pub water_level_cm: f64,
    pub battery_voltage: f64,
}

/// A rainfall observation from the tipping-bucket gauge (device 2),
/// including the derived incremental and hourly totals.
#[derive(Debug, Clone, PartialEq)]
pub struct RainfallReading {
    pub sensor_on_time: f64,
    pub hourly_rainfall: f64,
    pub daily_rainfall: f64,
    pub five_minute_rainfall: f64,
    pub raw_bucket_tips: i32,
    pub battery_voltage: f64,
}

/// A parsed transmission, tagged by the table it belongs in.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    WaterLevel(WaterLevelReading),
    Rainfall(RainfallReading),
}

/// Rolling state carried between polling cycles for the rainfall device.
///
/// Owned by the poll loop only; the accumulator takes it by reference and
/// returns a successor, which the loop swaps in after a successful parse.
/// Not persisted: a process restart re-baselines from whatever the device
/// reports next.
#[derive(Debug, Clone, PartialEq)]
pub struct RainfallTracker {
    pub daily_rainfall: f64,
    pub sensor_on_time: f64,
    pub hourly_rainfall: f64,
    pub hour_of_day: u32,
}

impl RainfallTracker {
    pub fn new(current_hour: u32) -> Self {
        RainfallTracker {
            daily_rainfall: 0.0,
            sensor_on_time: 0.0,
            hourly_rainfall: 0.0,
            hour_of_day: current_hour,
        }
    }
}
