mod config;
mod database;
mod lora;
mod models;
mod parser;
mod utils;

use log::{debug, error, info};
use std::time::Duration;
use tokio::time::sleep;

use config::StationConfig;
use database::store_reading;
use lora::LoraLink;
use models::RainfallTracker;
use utils::{current_hour, format_datetime, now_station};

async fn main_loop(config: StationConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting creek telemetry receiver");

    let mut link = LoraLink::connect(&config)?;
    let mut tracker = RainfallTracker::new(current_hour());

    let listen_timeout = Duration::from_secs(config.listen_timeout_secs);
    let poll_interval = Duration::from_secs(config.poll_interval_secs);

    info!("Listening started at: {}", format_datetime(&now_station()));

    loop {
        debug!("Listening for transmission..");

        if let Some(packet) = link.receive(listen_timeout).await {
            info!(
                "Received: {}, Signal strength: {} dBm",
                packet.payload, packet.rssi
            );

            match parser::parse_transmission(
                &packet.payload,
                &tracker,
                current_hour(),
                config.sensor_offset_cm,
            ) {
                Ok((reading, next_state)) => {
                    // The device's counters have moved on whether or not the
                    // insert below succeeds, so the tracker advances first;
                    // re-using the stale baseline would double-count rain.
                    if let Some(next_state) = next_state {
                        tracker = next_state;
                    }

                    match store_reading(&reading, &config.database_url).await {
                        Ok(()) => info!("Added to database"),
                        Err(e) => error!("Failed to store reading: {}", e),
                    }
                }
                Err(e) => error!("Data parsing error: {}", e),
            }
        }

        sleep(poll_interval).await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match StationConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        let _ = tx.send(());
    });

    // Run main loop or wait for shutdown signal
    tokio::select! {
        result = main_loop(config) => {
            match result {
                Ok(_) => info!("Program completed successfully"),
                Err(e) => error!("Fatal error: {}", e),
            }
        }
        _ = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
