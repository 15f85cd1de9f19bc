//! OSC gateway: inbound UDP listener routed by address pattern, plus the outbound send
//! primitive handlers use to reply to VRChat.

mod args;
mod outbound;
mod server;

pub use args::{expect_arity, string_arg, text_arg, ArgError};
pub use outbound::{OscOutbound, OscSender, UdpOutbound};
pub use server::ProtocolGateway;

use rosc::{OscMessage, OscType};
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not resolve OSC peer {0}")]
    Resolve(String),
    #[error("failed to encode OSC packet: {0}")]
    Encode(String),
    #[error("OSC socket error: {0}")]
    Io(#[from] std::io::Error),
}

/// Handler for one OSC address pattern.
#[async_trait::async_trait]
pub trait OscHandler: Send + Sync {
    /// Exact address this handler serves (e.g. `/vrchat/chat`).
    fn address(&self) -> &str;

    /// Handles one decoded message. `Err` means the arguments did not have the expected shape.
    async fn handle(&self, args: Vec<OscType>) -> Result<(), ArgError>;
}

/// Address → handler table. At most one handler per address.
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn OscHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Registers `handler`, replacing any handler already bound to the same address.
    pub fn register(&mut self, handler: Arc<dyn OscHandler>) {
        self.handlers.retain(|h| h.address() != handler.address());
        self.handlers.push(handler);
    }

    pub fn get(&self, address: &str) -> Option<Arc<dyn OscHandler>> {
        self.handlers.iter().find(|h| h.address() == address).cloned()
    }

    /// Addresses with a registered handler, in registration order.
    pub fn addresses(&self) -> Vec<String> {
        self.handlers.iter().map(|h| h.address().to_string()).collect()
    }

    /// Runs the handler for `message.addr`. Returns false when no handler is registered;
    /// the message is dropped. Argument-shape errors are logged here.
    pub async fn dispatch(&self, message: OscMessage) -> bool {
        let Some(handler) = self.get(&message.addr) else {
            return false;
        };
        if let Err(e) = handler.handle(message.args).await {
            warn!(target: "vrc::gateway", address = %message.addr, error = %e, "Dropping OSC message with unexpected arguments");
        }
        true
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        address: &'static str,
        tag: &'static str,
        seen: Arc<Mutex<Vec<(String, Vec<OscType>)>>>,
    }

    #[async_trait::async_trait]
    impl OscHandler for Recorder {
        fn address(&self) -> &str {
            self.address
        }

        async fn handle(&self, args: Vec<OscType>) -> Result<(), ArgError> {
            expect_arity(self.address, &args, 1)?;
            self.seen.lock().unwrap().push((self.tag.to_string(), args));
            Ok(())
        }
    }

    fn recorder(address: &'static str, tag: &'static str, seen: &Arc<Mutex<Vec<(String, Vec<OscType>)>>>) -> Arc<dyn OscHandler> {
        Arc::new(Recorder {
            address,
            tag,
            seen: Arc::clone(seen),
        })
    }

    fn message(addr: &str, args: Vec<OscType>) -> OscMessage {
        OscMessage {
            addr: addr.to_string(),
            args,
        }
    }

    #[tokio::test]
    async fn routes_by_exact_address() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        registry.register(recorder("/vrchat/chat", "chat", &seen));
        registry.register(recorder("/vrchat/interaction", "interaction", &seen));

        assert!(registry.dispatch(message("/vrchat/interaction", vec![OscType::Int(1)])).await);
        assert!(!registry.dispatch(message("/vrchat/chat/extra", vec![OscType::Int(2)])).await);
        assert!(!registry.dispatch(message("/vrchat/unknown", vec![OscType::Int(3)])).await);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "interaction");
    }

    #[tokio::test]
    async fn second_registration_replaces_first() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        registry.register(recorder("/vrchat/chat", "old", &seen));
        registry.register(recorder("/vrchat/chat", "new", &seen));
        assert_eq!(registry.addresses(), vec!["/vrchat/chat"]);

        registry.dispatch(message("/vrchat/chat", vec![OscType::Int(1)])).await;
        assert_eq!(seen.lock().unwrap()[0].0, "new");
    }

    #[tokio::test]
    async fn bad_arguments_are_routed_but_not_handled() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        registry.register(recorder("/vrchat/chat", "chat", &seen));

        assert!(registry.dispatch(message("/vrchat/chat", Vec::new())).await);
        assert!(seen.lock().unwrap().is_empty());
    }
}
