use std::env;
use std::str::FromStr;

use log::info;

const DEFAULT_SERIAL_PORT: &str = "/dev/ttyUSB0";
const DEFAULT_BAUD_RATE: u32 = 115_200;
const DEFAULT_SENSOR_OFFSET_CM: f64 = 600.0;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
const DEFAULT_LISTEN_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct StationConfig {
    pub database_url: String,
    pub serial_port: String,
    pub baud_rate: u32,
    /// Distance from the ultrasonic sensor mount down to the creek bed, in cm
    pub sensor_offset_cm: f64,
    pub poll_interval_secs: u64,
    pub listen_timeout_secs: u64,
}

impl StationConfig {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL environment variable not set")?;

        let serial_port =
            env::var("LORA_SERIAL_PORT").unwrap_or_else(|_| DEFAULT_SERIAL_PORT.to_string());

        let baud_rate = env_or("LORA_BAUD_RATE", DEFAULT_BAUD_RATE)?;
        let sensor_offset_cm = env_or("SENSOR_OFFSET_CM", DEFAULT_SENSOR_OFFSET_CM)?;
        let poll_interval_secs = env_or("POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;
        let listen_timeout_secs = env_or("LISTEN_TIMEOUT_SECS", DEFAULT_LISTEN_TIMEOUT_SECS)?;

        info!(
            "Configured: modem {} @ {} baud, sensor offset {} cm, poll every {}s, listen {}s",
            serial_port, baud_rate, sensor_offset_cm, poll_interval_secs, listen_timeout_secs
        );

        Ok(StationConfig {
            database_url,
            serial_port,
            baud_rate,
            sensor_offset_cm,
            poll_interval_secs,
            listen_timeout_secs,
        })
    }
}

/// Read an optional numeric environment variable, falling back to a default.
/// A set-but-unparseable value is a startup error rather than a silent default.
fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, Box<dyn std::error::Error>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{} is not a valid number: {:?}", key, raw).into()),
        Err(_) => Ok(default),
    }
}
