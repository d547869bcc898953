//! Serial GNSS reader.
//!
//! Ownship's own position, altitude, and ground track come from whatever
//! NMEA-speaking GPS receiver is wired to the configured serial device.
//! Every connection attempt -- including the very first -- is preceded by a
//! fixed 5 second wait, matching the original reader's unconditional
//! `sleep` at the top of its reconnect loop.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::sleep;
use tokio_serial::SerialPortBuilderExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::hub::{ContentType, HubHandle, HubMessage};

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct GnssSerialConfig {
    pub device: String,
    pub baud_rate: u32,
}

pub struct GnssSerialReader {
    config: GnssSerialConfig,
    hub: HubHandle,
}

impl GnssSerialReader {
    pub fn new(config: GnssSerialConfig, hub: HubHandle) -> Self {
        Self { config, hub }
    }

    #[tracing::instrument(skip(self, cancel), fields(device = %self.config.device, baud = self.config.baud_rate))]
    pub async fn run(&self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = sleep(RECONNECT_DELAY) => {}
            }

            match tokio_serial::new(&self.config.device, self.config.baud_rate).open_native_async() {
                Ok(port) => {
                    info!("opened serial GNSS device {}", self.config.device);
                    metrics::gauge!("gnss.serial.connected").set(1.0);
                    self.read_loop(port, &cancel).await;
                    metrics::gauge!("gnss.serial.connected").set(0.0);
                }
                Err(e) => {
                    warn!("could not open serial GNSS device {}: {e}", self.config.device);
                }
            }
        }
    }

    async fn read_loop(&self, port: tokio_serial::SerialStream, cancel: &CancellationToken) {
        let mut lines = BufReader::new(port).lines();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            let line = line.trim();
                            if !line.is_empty() {
                                metrics::counter!("gnss.serial.lines_total").increment(1);
                                self.hub.submit(HubMessage::new(ContentType::Nmea, line.to_string())).await;
                            }
                        }
                        Ok(None) => {
                            debug!("serial GNSS device {} closed", self.config.device);
                            return;
                        }
                        Err(e) => {
                            warn!("serial GNSS read error on {}: {e}", self.config.device);
                            return;
                        }
                    }
                }
            }
        }
    }
}
