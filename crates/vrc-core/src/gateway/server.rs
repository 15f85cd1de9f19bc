//! Inbound OSC UDP server. One background task reads datagrams; each decoded message is
//! dispatched on its own task so a slow handler (e.g. a hung webhook) does not stall the socket.

use super::{GatewayError, HandlerRegistry};
use rosc::{OscMessage, OscPacket};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Largest UDP payload; OSC packets never exceed one datagram.
const RECV_BUFFER_SIZE: usize = 65_507;

/// First pause after a failed receive; doubles per consecutive failure up to the cap.
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(10);
const RECV_ERROR_BACKOFF_MAX: Duration = Duration::from_secs(1);

struct Running {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the inbound listener. `start` binds and serves in the background; `stop` cancels
/// the serve loop, joins it, and releases the socket.
pub struct ProtocolGateway {
    bind_addr: String,
    registry: Arc<HandlerRegistry>,
    shutdown: CancellationToken,
    log_unrouted: bool,
    running: Mutex<Option<Running>>,
}

impl ProtocolGateway {
    /// `shutdown` is the process-wide token; cancelling it also stops this gateway's loop.
    pub fn new(bind_addr: impl Into<String>, registry: Arc<HandlerRegistry>, shutdown: CancellationToken) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            registry,
            shutdown,
            log_unrouted: false,
            running: Mutex::new(None),
        }
    }

    /// Log (at info) messages whose address has no handler instead of dropping them silently.
    pub fn with_unrouted_logging(mut self, enabled: bool) -> Self {
        self.log_unrouted = enabled;
        self
    }

    /// Address actually bound, while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|r| r.local_addr)
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Binds the inbound socket and spawns the serve loop. No retry: a port already in use is
    /// returned as [`GatewayError::Bind`]. Calling again while running returns the bound address.
    pub async fn start(&self) -> Result<SocketAddr, GatewayError> {
        let mut running = self.running.lock().await;
        if let Some(r) = running.as_ref() {
            return Ok(r.local_addr);
        }

        let socket = UdpSocket::bind(self.bind_addr.as_str())
            .await
            .map_err(|source| GatewayError::Bind {
                addr: self.bind_addr.clone(),
                source,
            })?;
        let local_addr = socket.local_addr()?;
        let cancel = self.shutdown.child_token();
        let task = tokio::spawn(serve(
            socket,
            Arc::clone(&self.registry),
            cancel.clone(),
            self.log_unrouted,
        ));

        info!(target: "vrc::gateway", addr = %local_addr, routes = ?self.registry.addresses(), "OSC server listening");
        *running = Some(Running {
            local_addr,
            cancel,
            task,
        });
        Ok(local_addr)
    }

    /// Stops the serve loop and waits for it to release the socket. Safe to call repeatedly
    /// or without a prior `start`. In-flight handler tasks are left to finish on their own.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };
        running.cancel.cancel();
        if let Err(e) = running.task.await {
            warn!(target: "vrc::gateway", error = %e, "OSC server task ended abnormally");
        }
        info!(target: "vrc::gateway", addr = %running.local_addr, "OSC server stopped");
    }
}

async fn serve(socket: UdpSocket, registry: Arc<HandlerRegistry>, cancel: CancellationToken, log_unrouted: bool) {
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];
    let mut failures: u32 = 0;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok((len, peer)) => {
                    failures = 0;
                    match rosc::decoder::decode_udp(&buf[..len]) {
                        Ok((_, packet)) => {
                            for message in flatten(packet) {
                                let registry = Arc::clone(&registry);
                                tokio::spawn(async move {
                                    let addr = message.addr.clone();
                                    if !registry.dispatch(message).await && log_unrouted {
                                        info!(target: "vrc::gateway", address = %addr, %peer, "Received unhandled OSC message");
                                    }
                                });
                            }
                        }
                        Err(e) => debug!(target: "vrc::gateway", %peer, error = ?e, "Ignoring undecodable OSC datagram"),
                    }
                }
                // Usually transient (e.g. ICMP port unreachable surfaced on recv); a socket
                // that keeps failing is polled at a decaying rate instead of spinning.
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let pause = recv_backoff(failures);
                    warn!(target: "vrc::gateway", error = %e, failures, pause_ms = pause.as_millis() as u64, "OSC receive failed");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(pause) => {}
                    }
                }
            },
        }
    }
}

/// Pause before the next receive after `failures` consecutive errors.
fn recv_backoff(failures: u32) -> Duration {
    let exp = failures.saturating_sub(1).min(16);
    RECV_ERROR_BACKOFF
        .saturating_mul(1u32 << exp)
        .min(RECV_ERROR_BACKOFF_MAX)
}

/// Bundles are unpacked depth-first; messages keep their order.
fn flatten(packet: OscPacket) -> Vec<OscMessage> {
    match packet {
        OscPacket::Message(message) => vec![message],
        OscPacket::Bundle(bundle) => bundle.content.into_iter().flat_map(flatten).collect(),
    }
}
