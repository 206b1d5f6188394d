/// Database operations for storing water-level and rainfall readings
use chrono::NaiveDateTime;

use crate::database::connection::{connect, StoreError};
use crate::models::Reading;
use crate::utils;

/// Store one reading in its table
///
/// Opens a connection, inserts a single row stamped with the station's civil
/// wall-clock time, and drops the connection. There is no retry: a failed
/// insert is reported to the caller, which logs it and drops the reading.
///
/// # Arguments
/// * `reading` - the parsed reading, tagged with its destination table
/// * `database_url` - PostgreSQL connection string
///
/// # Returns
/// Result indicating success or failure
pub async fn store_reading(reading: &Reading, database_url: &str) -> Result<(), StoreError> {
    let client = connect(database_url).await?;

    // The timestamp is assigned here, at insert time, not carried on the reading
    let timestamp: NaiveDateTime = utils::now_station().naive_local();

    match reading {
        Reading::WaterLevel(r) => {
            client
                .execute(
                    "INSERT INTO water_level(timestamp, level, battery_voltage)
                     VALUES ($1, $2, $3)",
                    &[&timestamp, &r.water_level_cm, &r.battery_voltage],
                )
                .await?;
        }
        Reading::Rainfall(r) => {
            client
                .execute(
                    "INSERT INTO rainfall_local(timestamp, sensor_on_time, hourly_rainfall, daily_rainfall, five_minute_rainfall, raw_bucket_tips, battery_voltage)
                     VALUES ($1, $2, $3, $4, $5, $6, $7)",
                    &[
                        &timestamp,
                        &r.sensor_on_time,
                        &r.hourly_rainfall,
                        &r.daily_rainfall,
                        &r.five_minute_rainfall,
                        &r.raw_bucket_tips,
                        &r.battery_voltage,
                    ],
                )
                .await?;
        }
    }

    Ok(())
}
