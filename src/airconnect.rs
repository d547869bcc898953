//! C9: AirConnect server.
//!
//! Listens for navigation-app clients and broadcasts every `nmea`/`flarm`
//! line the hub delivers to whichever clients have an enabled session.
//! Grounded on the same accept-loop/client-set-mutex shape as
//! [`crate::ogn::server`], mirrored for the outbound direction: there the
//! server receives beacon lines from one decoder, here it fans sentences out
//! to many tablets.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::hub::{ContentType, HubMessage};

struct Client {
    writer: Mutex<tokio::net::tcp::OwnedWriteHalf>,
    send_enabled: std::sync::atomic::AtomicBool,
}

type ClientSet = Arc<Mutex<HashMap<u64, Arc<Client>>>>;

pub struct AirConnectServer {
    listener: TcpListener,
    password: Option<String>,
    clients: ClientSet,
    next_client_id: AtomicU64,
}

impl AirConnectServer {
    pub async fn bind(port: u16, password: Option<String>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        info!("AirConnect server listening on port {port}");
        Ok(Self {
            listener,
            password,
            clients: Arc::new(Mutex::new(HashMap::new())),
            next_client_id: AtomicU64::new(1),
        })
    }

    /// Runs the accept loop and the output task concurrently until `cancel` fires.
    #[tracing::instrument(skip(self, content, cancel), fields(port = %self.listener.local_addr().map(|a| a.port()).unwrap_or_default()))]
    pub async fn run(self, content: flume::Receiver<Option<HubMessage>>, cancel: CancellationToken) {
        let output_clients = self.clients.clone();
        let output_cancel = cancel.clone();
        let output = tokio::spawn(async move {
            output_task(content, output_clients, output_cancel).await;
        });

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
                            info!("AirConnect client #{id} connected from {addr}");
                            metrics::counter!("airconnect.connections_total").increment(1);

                            let clients = self.clients.clone();
                            let password = self.password.clone();
                            let cancel = cancel.clone();
                            tokio::spawn(async move {
                                handle_client(id, stream, password, clients, cancel).await;
                            });
                        }
                        Err(e) => warn!("failed to accept AirConnect client connection: {e}"),
                    }
                }
            }
        }

        output.await.ok();
    }
}

/// Dequeues hub content and broadcasts it to every client with an enabled session.
async fn output_task(content: flume::Receiver<Option<HubMessage>>, clients: ClientSet, cancel: CancellationToken) {
    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => return,
            message = content.recv_async() => message,
        };

        match message {
            Ok(Some(message)) => {
                if !matches!(message.content_type, ContentType::Nmea | ContentType::Flarm) {
                    continue;
                }
                let line = format!("{}\r\n", message.payload);
                let snapshot: Vec<_> = clients.lock().await.values().cloned().collect();
                for client in snapshot {
                    if client.send_enabled.load(Ordering::Relaxed) {
                        let mut w = client.writer.lock().await;
                        let _ = w.write_all(line.as_bytes()).await;
                    }
                }
            }
            Ok(None) | Err(_) => return,
        }
    }
}

async fn handle_client(
    id: u64,
    stream: TcpStream,
    password: Option<String>,
    clients: ClientSet,
    cancel: CancellationToken,
) {
    let (read_half, write_half) = stream.into_split();
    let client = Arc::new(Client {
        writer: Mutex::new(write_half),
        send_enabled: std::sync::atomic::AtomicBool::new(password.is_none()),
    });
    clients.lock().await.insert(id, client.clone());

    if password.is_some() {
        let mut w = client.writer.lock().await;
        let _ = w.write_all(b"PASS?\r\n").await;
    }

    let mut lines = BufReader::new(read_half).lines();
    let mut awaiting_pass = password.is_some();

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line,
        };

        match line {
            Ok(Some(line)) => {
                let line = line.trim();

                if awaiting_pass {
                    if Some(line) == password.as_deref() {
                        client.send_enabled.store(true, Ordering::Relaxed);
                        awaiting_pass = false;
                    } else {
                        debug!("AirConnect client #{id} gave wrong password, closing");
                        break;
                    }
                    continue;
                }

                if !handle_command(line, id, &client, &clients).await {
                    break;
                }
            }
            Ok(None) => {
                debug!("AirConnect client #{id} disconnected");
                break;
            }
            Err(e) => {
                warn!("AirConnect client #{id} read error: {e}");
                break;
            }
        }
    }

    clients.lock().await.remove(&id);
    metrics::counter!("airconnect.disconnections_total").increment(1);
}

/// Handles one command line on an already-authorized session; returns
/// `false` if the connection should close.
async fn handle_command(line: &str, id: u64, client: &Arc<Client>, clients: &ClientSet) -> bool {
    if line.eq_ignore_ascii_case("exit") {
        return false;
    }

    if line.eq_ignore_ascii_case("list_clients") {
        let ids: Vec<String> = clients.lock().await.keys().map(|id| format!("#{id}")).collect();
        let reply = format!("{{{}}}\r\n", ids.join(", "));
        let mut w = client.writer.lock().await;
        let _ = w.write_all(reply.as_bytes()).await;
        return true;
    }

    let echoed = format!("{line}\r\n");
    let mut w = client.writer.lock().await;
    let _ = w.write_all(echoed.as_bytes()).await;
    debug!("AirConnect client #{id} sent unrecognized input, echoed back");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::{Hub, HubMessage, Subscription};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn broadcasts_nmea_and_flarm_to_enabled_clients() {
        let server = AirConnectServer::bind(0, None).await.unwrap();
        let addr = server.listener.local_addr().unwrap();

        let mut hub = Hub::new();
        let subscription = hub.subscribe(Subscription::Any);
        let hub_handle = hub.handle();
        let hub_task = tokio::spawn(hub.run());

        let cancel = CancellationToken::new();
        let server_cancel = cancel.clone();
        let server_task = tokio::spawn(server.run(subscription, server_cancel));

        let mut client = TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        hub_handle
            .submit(HubMessage::new(ContentType::Flarm, "$PFLAA,0,0,0,,1,ABCDEF,,,,,0*00"))
            .await;

        let mut buf = [0u8; 128];
        let n = tokio::time::timeout(std::time::Duration::from_secs(1), client.read(&mut buf))
            .await
            .expect("should receive broadcast")
            .unwrap();
        let received = String::from_utf8_lossy(&buf[..n]);
        assert!(received.starts_with("$PFLAA,0,0,0,,1,ABCDEF"));
        assert!(received.ends_with("\r\n"));

        cancel.cancel();
        hub_handle.shutdown().await;
        hub_task.await.unwrap();
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn password_gate_rejects_wrong_password() {
        let server = AirConnectServer::bind(0, Some("secret".to_string())).await.unwrap();
        let addr = server.listener.local_addr().unwrap();

        let mut hub = Hub::new();
        let subscription = hub.subscribe(Subscription::Any);
        let hub_handle = hub.handle();
        let hub_task = tokio::spawn(hub.run());

        let cancel = CancellationToken::new();
        let server_cancel = cancel.clone();
        let server_task = tokio::spawn(server.run(subscription, server_cancel));

        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut buf = [0u8; 32];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"PASS?\r\n");

        client.write_all(b"wrong\r\n").await.unwrap();
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(n, 0, "connection should be closed after a bad password");

        cancel.cancel();
        hub_handle.shutdown().await;
        hub_task.await.unwrap();
        server_task.await.unwrap();
    }
}
