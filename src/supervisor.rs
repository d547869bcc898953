//! C10: starts the hub, the fusion component, every ingest endpoint, and
//! the AirConnect server, then waits for shutdown.
//!
//! Grounded on the upstream `stream_manager` module's task-lifecycle style
//! (a [`CancellationToken`] per task plus its [`JoinHandle`]), simplified to
//! this system's fixed set of long-lived tasks rather than a dynamically
//! reconfigurable stream list -- this system has a fixed startup order, not
//! hot config reload.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::airconnect::AirConnectServer;
use crate::config::Config;
use crate::fusion;
use crate::hub::{ContentType, Hub, Subscription};
use crate::nmea::{GnssSerialConfig, GnssSerialReader};
use crate::ogn::OgnAprsServer;
use crate::sbs::{SbsClient, SbsClientConfig};
use crate::store::Store;

/// Runs every component until an external shutdown signal arrives (or, in
/// tests, until `shutdown` is cancelled directly), then joins everything.
pub async fn run(config: Config, shutdown: CancellationToken) -> anyhow::Result<()> {
    let store = Arc::new(Store::new());

    let mut hub = Hub::new();
    let fusion_input_rx = hub.subscribe(Subscription::Types(vec![ContentType::Sbs1, ContentType::Ogn, ContentType::Nmea]));
    let airconnect_rx = hub.subscribe(Subscription::Any);
    let hub_handle = hub.handle();

    info!("starting dispatch hub");
    let hub_task = tokio::spawn(hub.run());

    info!("starting fusion input and tick tasks");
    let fusion_input_task = tokio::spawn(fusion::input_task(fusion_input_rx, store.clone()));
    let fusion_tick_task = tokio::spawn(fusion::tick_task(store.clone(), hub_handle.clone(), shutdown.clone()));

    info!("starting AirConnect server on port {}", config.airconnect_port);
    let airconnect = AirConnectServer::bind(config.airconnect_port, config.airconnect_password.clone()).await?;
    let airconnect_task = tokio::spawn(airconnect.run(airconnect_rx, shutdown.clone()));

    info!("starting OGN APRS server on port {}", config.ogn_port);
    let ogn_server = OgnAprsServer::bind(config.ogn_port, hub_handle.clone()).await?;
    let ogn_task = tokio::spawn(ogn_server.run(shutdown.clone()));

    info!("starting SBS1 client for {}:{}", config.sbs_host, config.sbs_port);
    let sbs_client = SbsClient::new(
        SbsClientConfig {
            server: config.sbs_host.clone(),
            port: config.sbs_port,
        },
        hub_handle.clone(),
    );
    let sbs_shutdown = shutdown.clone();
    let sbs_task = tokio::spawn(async move { sbs_client.run(sbs_shutdown).await });

    info!("starting GNSS serial reader on {} @ {}", config.serial_device, config.serial_baud);
    let serial_reader = GnssSerialReader::new(
        GnssSerialConfig {
            device: config.serial_device.clone(),
            baud_rate: config.serial_baud,
        },
        hub_handle.clone(),
    );
    let serial_shutdown = shutdown.clone();
    let serial_task = tokio::spawn(async move { serial_reader.run(serial_shutdown).await });

    shutdown.cancelled().await;
    info!("shutdown requested, propagating sentinel through the hub");
    hub_handle.shutdown().await;

    let _ = tokio::join!(
        hub_task,
        fusion_input_task,
        fusion_tick_task,
        airconnect_task,
        ogn_task,
        sbs_task,
        serial_task,
    );
    info!("all tasks joined, exiting");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shuts_down_cleanly_when_cancelled_immediately() {
        let config = Config {
            sbs_host: "127.0.0.1".to_string(),
            sbs_port: 0,
            ogn_port: 0,
            serial_device: "/dev/does-not-exist".to_string(),
            serial_baud: 9600,
            airconnect_port: 0,
            airconnect_password: None,
            log_file: None,
        };
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let result = tokio::time::timeout(std::time::Duration::from_secs(5), run(config, shutdown)).await;
        assert!(result.is_ok(), "supervisor should shut down promptly once cancelled");
    }
}
