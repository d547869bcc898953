//! Emulated APRS-IS server.
//!
//! OGN decoders (ogn-rf, rtlsdr-ogn) are configured to "upload" beacons to
//! an APRS-IS server; this listens on that port and plays the server side
//! of the protocol well enough to satisfy them: a login banner, a login
//! acknowledgement, a 20 second heartbeat, and otherwise treating every
//! line received as an OGN beacon to hand to the hub.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::hub::{ContentType, HubHandle, HubMessage};

const SERVER_SOFTWARE: &str = "flightbox 1.0";
const SERVER_NAME: &str = "FLIGHTBOX";
const HEARTBEAT_PERIOD: Duration = Duration::from_secs(20);

struct ClientHandle {
    writer: Mutex<tokio::net::tcp::OwnedWriteHalf>,
}

pub struct OgnAprsServer {
    listener: TcpListener,
    hub: HubHandle,
    writers: Arc<Mutex<std::collections::HashMap<u64, Arc<ClientHandle>>>>,
    next_client_id: AtomicU64,
}

impl OgnAprsServer {
    pub async fn bind(port: u16, hub: HubHandle) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        info!("OGN APRS server listening on port {port}");
        Ok(Self {
            listener,
            hub,
            writers: Arc::new(Mutex::new(std::collections::HashMap::new())),
            next_client_id: AtomicU64::new(1),
        })
    }

    #[tracing::instrument(skip(self, cancel), fields(port = %self.listener.local_addr().map(|a| a.port()).unwrap_or_default()))]
    pub async fn run(self, cancel: CancellationToken) {
        let heartbeat_cancel = cancel.clone();
        let heartbeat_writers = self.writers.clone();
        let heartbeat = tokio::spawn(async move {
            heartbeat_loop(heartbeat_writers, heartbeat_cancel).await;
        });

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
                            info!("OGN client #{id} connected from {addr}");
                            metrics::counter!("ogn.server.connections_total").increment(1);

                            let hub = self.hub.clone();
                            let writers = self.writers.clone();
                            let cancel = cancel.clone();
                            tokio::spawn(async move {
                                handle_client(id, stream, hub, writers, cancel).await;
                            });
                        }
                        Err(e) => warn!("failed to accept OGN client connection: {e}"),
                    }
                }
            }
        }

        heartbeat.await.ok();
    }
}

async fn heartbeat_loop(
    writers: Arc<Mutex<std::collections::HashMap<u64, Arc<ClientHandle>>>>,
    cancel: CancellationToken,
) {
    let mut ticker = interval(HEARTBEAT_PERIOD);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                let heartbeat = format!(
                    "# {} {} {} 127.0.0.1:14580\r\n",
                    SERVER_SOFTWARE,
                    Utc::now().format("%d %b %Y %H:%M:%S GMT"),
                    SERVER_NAME,
                );
                let snapshot: Vec<_> = writers.lock().await.values().cloned().collect();
                for client in snapshot {
                    let mut w = client.writer.lock().await;
                    let _ = w.write_all(heartbeat.as_bytes()).await;
                }
            }
        }
    }
}

async fn handle_client(
    id: u64,
    stream: TcpStream,
    hub: HubHandle,
    writers: Arc<Mutex<std::collections::HashMap<u64, Arc<ClientHandle>>>>,
    cancel: CancellationToken,
) {
    let (read_half, write_half) = stream.into_split();
    let handle = Arc::new(ClientHandle {
        writer: Mutex::new(write_half),
    });

    writers.lock().await.insert(id, handle.clone());

    {
        let mut w = handle.writer.lock().await;
        let _ = w.write_all(format!("# {SERVER_SOFTWARE}\r\n").as_bytes()).await;
    }

    let mut lines = BufReader::new(read_half).lines();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if !handle_line(&line, &hub, &handle).await {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!("OGN client #{id} disconnected");
                        break;
                    }
                    Err(e) => {
                        warn!("OGN client #{id} read error: {e}");
                        break;
                    }
                }
            }
        }
    }

    writers.lock().await.remove(&id);
}

/// Handles one line from a client; returns `false` if the connection should close.
async fn handle_line(line: &str, hub: &HubHandle, handle: &Arc<ClientHandle>) -> bool {
    let line = line.trim();

    if let Some((user, _password)) = parse_login(line) {
        let reply = format!("# logresp {user} verified, server {SERVER_NAME}\r\n");
        let mut w = handle.writer.lock().await;
        let _ = w.write_all(reply.as_bytes()).await;
        return true;
    }

    if line.eq_ignore_ascii_case("exit") {
        return false;
    }

    if line.is_empty() || line.starts_with('#') {
        return true;
    }

    metrics::counter!("ogn.server.beacons_total").increment(1);
    hub.submit(HubMessage::new(ContentType::Ogn, line.to_string())).await;
    true
}

/// Matches `user <callsign> pass <password> vers <software>`.
fn parse_login(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix("user ")?;
    let (user, rest) = rest.split_once(" pass ")?;
    let (password, _vers) = rest.split_once(" vers ")?;
    Some((user, password))
}
