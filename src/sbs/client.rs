//! TCP client for the Kinetic BaseStation SBS1 feed.
//!
//! Reconnects on a flat 5 second delay regardless of how the previous
//! attempt failed -- no exponential backoff, matching the flat retry the
//! original ingest loop used rather than the backoff scheme common
//! elsewhere in this codebase.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::hub::{ContentType, HubHandle, HubMessage};
use crate::sbs::parser::parse_sbs_message;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SbsClientConfig {
    pub server: String,
    pub port: u16,
}

impl Default for SbsClientConfig {
    fn default() -> Self {
        Self {
            server: "localhost".to_string(),
            port: 30003,
        }
    }
}

pub struct SbsClient {
    config: SbsClientConfig,
    hub: HubHandle,
}

impl SbsClient {
    pub fn new(config: SbsClientConfig, hub: HubHandle) -> Self {
        Self { config, hub }
    }

    /// Runs the connect/read/reconnect loop until `cancel` fires.
    #[tracing::instrument(skip(self, cancel), fields(server = %self.config.server, port = self.config.port))]
    pub async fn run(&self, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                return;
            }

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = self.connect_and_process(&cancel) => {}
            }

            metrics::counter!("sbs.reconnect_total").increment(1);
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = sleep(RECONNECT_DELAY) => {}
            }
        }
    }

    async fn connect_and_process(&self, cancel: &CancellationToken) {
        let address = format!("{}:{}", self.config.server, self.config.port);
        info!("connecting to SBS server at {address}");

        let stream = match TcpStream::connect(&address).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("failed to connect to SBS server at {address}: {e}");
                return;
            }
        };
        metrics::gauge!("sbs.connected").set(1.0);
        info!("connected to SBS server at {address}");

        let reader = BufReader::new(stream);
        let mut lines = reader.lines();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    metrics::gauge!("sbs.connected").set(0.0);
                    return;
                }
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => self.handle_line(&line).await,
                        Ok(None) => {
                            debug!("SBS connection to {address} closed by peer");
                            metrics::gauge!("sbs.connected").set(0.0);
                            return;
                        }
                        Err(e) => {
                            warn!("SBS connection to {address} failed: {e}");
                            metrics::gauge!("sbs.connected").set(0.0);
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn handle_line(&self, line: &str) {
        match parse_sbs_message(line) {
            Ok(message) if message.message_type.is_relevant() => {
                trace!(aircraft_id = %message.aircraft_id, "received SBS1 message");
                metrics::counter!("sbs.messages_total").increment(1);
                self.hub.submit(HubMessage::new(ContentType::Sbs1, line.to_string())).await;
            }
            Ok(_) => {} // MSG,5-8: valid but nothing this system uses
            Err(e) => {
                trace!("discarding unparseable SBS1 line: {e}");
            }
        }
    }
}
