/// Serial LoRa modem link and received-frame decoding
use log::{debug, error, info, warn};
use serialport::SerialPort;
use std::io::{BufRead, BufReader, ErrorKind};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::StationConfig;

// Modem link constants
const READ_TIMEOUT_MS: u64 = 500; // serial read timeout on a quiet link
const CHANNEL_CAPACITY: usize = 32; // frames buffered while the poll loop sleeps

/// One received transmission as reported by the modem.
///
/// Signal quality figures are kept for logging only; they are never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct LoraPacket {
    pub payload: String,
    pub rssi: i32,
    pub snr: i32,
}

/// Handle to the modem's receive side.
///
/// The serialport API is blocking, so a dedicated reader thread owns the port
/// and hands decoded frames to the async side over a bounded channel.
pub struct LoraLink {
    rx: mpsc::Receiver<LoraPacket>,
}

impl LoraLink {
    /// Open the modem serial port and start the background reader thread.
    ///
    /// Failure here (missing device, permissions) is fatal at startup.
    pub fn connect(config: &StationConfig) -> Result<Self, serialport::Error> {
        let port = serialport::new(&config.serial_port, config.baud_rate)
            .timeout(Duration::from_millis(READ_TIMEOUT_MS))
            .flow_control(serialport::FlowControl::None)
            .open()?;

        info!(
            "Opened LoRa modem on {} at {} baud",
            config.serial_port, config.baud_rate
        );

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        thread::spawn(move || read_loop(port, tx));

        Ok(LoraLink { rx })
    }

    /// Wait up to `timeout` for the next transmission.
    ///
    /// Returns None when the listen window elapses without a frame arriving.
    pub async fn receive(&mut self, timeout: Duration) -> Option<LoraPacket> {
        tokio::time::timeout(timeout, self.rx.recv())
            .await
            .ok()
            .flatten()
    }
}

fn read_loop(port: Box<dyn SerialPort>, tx: mpsc::Sender<LoraPacket>) {
    let mut reader = BufReader::new(port);
    let mut buf: Vec<u8> = Vec::new();

    loop {
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                error!("LoRa modem port returned EOF, stopping reader");
                return;
            }
            Ok(_) if buf.ends_with(b"\n") => {
                if let Some(packet) = decode_frame(&buf) {
                    if tx.blocking_send(packet).is_err() {
                        // Receive side dropped, process is shutting down
                        return;
                    }
                }
                buf.clear();
            }
            Ok(_) => {} // no delimiter yet, keep accumulating
            Err(e) if e.kind() == ErrorKind::TimedOut => {} // quiet link, partial line kept
            Err(e) => {
                error!("Serial read error: {}", e);
                thread::sleep(Duration::from_secs(1));
            }
        }
    }
}

/// Decode one newline-terminated line from the modem.
///
/// Received transmissions arrive as `+RCV=<address>,<length>,<data>,<rssi>,<snr>`.
/// The data section may itself contain commas, so it is delimited by the
/// declared length rather than by splitting. Any other line is command
/// response chatter (`+OK` and friends) and is skipped.
///
/// # Arguments
/// * `raw` - the frame bytes, including the line terminator
///
/// # Returns
/// Some(LoraPacket) for a well-formed receive frame, None otherwise
fn decode_frame(raw: &[u8]) -> Option<LoraPacket> {
    if !raw.is_ascii() {
        warn!("Received frame could not be decoded as ASCII: {:?}", raw);
        return None;
    }

    // ASCII is always valid UTF-8
    let line = std::str::from_utf8(raw).ok()?.trim();
    if line.is_empty() {
        return None;
    }

    let body = match line.strip_prefix("+RCV=") {
        Some(body) => body,
        None => {
            debug!("Ignoring modem response: {}", line);
            return None;
        }
    };

    match parse_rcv_body(body) {
        Some(packet) => {
            debug!(
                "Frame from modem: {:?} (RSSI {} dBm, SNR {})",
                packet.payload, packet.rssi, packet.snr
            );
            Some(packet)
        }
        None => {
            warn!("Malformed receive frame: {}", line);
            None
        }
    }
}

fn parse_rcv_body(body: &str) -> Option<LoraPacket> {
    let mut head = body.splitn(3, ',');
    let _address = head.next()?;
    let length: usize = head.next()?.trim().parse().ok()?;
    let rest = head.next()?;

    if rest.len() < length {
        return None;
    }
    let (payload, tail) = rest.split_at(length);

    let mut tail = tail.strip_prefix(',')?.splitn(2, ',');
    let rssi: i32 = tail.next()?.trim().parse().ok()?;
    let snr: i32 = tail.next()?.trim().parse().ok()?;

    Some(LoraPacket {
        payload: payload.to_string(),
        rssi,
        snr,
    })
}
