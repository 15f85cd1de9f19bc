//! Outbound OSC to a fixed peer (the VRChat client).

use super::GatewayError;
use rosc::{OscMessage, OscPacket, OscType};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

/// Transport for encoded outbound messages.
#[async_trait::async_trait]
pub trait OscOutbound: Send + Sync {
    async fn transmit(&self, message: &OscMessage) -> Result<(), GatewayError>;
}

/// UDP client bound to an ephemeral local port, sending to one peer.
pub struct UdpOutbound {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UdpOutbound {
    /// Resolves `peer` (`host:port`) and binds a local socket of the matching family.
    pub async fn connect(peer: &str) -> Result<Self, GatewayError> {
        let peer_addr = tokio::net::lookup_host(peer)
            .await
            .map_err(|_| GatewayError::Resolve(peer.to_string()))?
            .next()
            .ok_or_else(|| GatewayError::Resolve(peer.to_string()))?;
        let local = if peer_addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(local).await.map_err(|source| GatewayError::Bind {
            addr: local.to_string(),
            source,
        })?;
        Ok(Self {
            socket,
            peer: peer_addr,
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

#[async_trait::async_trait]
impl OscOutbound for UdpOutbound {
    async fn transmit(&self, message: &OscMessage) -> Result<(), GatewayError> {
        let bytes = rosc::encoder::encode(&OscPacket::Message(message.clone()))
            .map_err(|e| GatewayError::Encode(format!("{e:?}")))?;
        self.socket.send_to(&bytes, self.peer).await?;
        Ok(())
    }
}

/// The send primitive handed to handlers. Fire-and-forget: failures are logged only.
#[derive(Clone)]
pub struct OscSender {
    outbound: Option<Arc<dyn OscOutbound>>,
}

impl OscSender {
    pub fn new(outbound: Arc<dyn OscOutbound>) -> Self {
        Self {
            outbound: Some(outbound),
        }
    }

    /// Sender with no outbound channel (client failed to initialize). Every send is logged and dropped.
    pub fn disconnected() -> Self {
        Self { outbound: None }
    }

    pub fn is_connected(&self) -> bool {
        self.outbound.is_some()
    }

    pub async fn send(&self, address: &str, args: Vec<OscType>) {
        let Some(outbound) = &self.outbound else {
            warn!(target: "vrc::gateway", address, "OSC client not initialized; cannot send message");
            return;
        };
        let message = OscMessage {
            addr: address.to_string(),
            args,
        };
        match outbound.transmit(&message).await {
            Ok(()) => debug!(target: "vrc::gateway", address, "Sent OSC to VRChat"),
            Err(e) => warn!(target: "vrc::gateway", address, error = %e, "Error sending OSC to VRChat"),
        }
    }
}
