//! vrc-core: VRChat OSC bridge core (config, knowledge base, response matcher, OSC gateway,
//! webhook notifications).
//!
//! The `vrc-gateway` add-on wires these together into a running service; everything here is
//! owned and injected explicitly, there is no module-level state.

mod gateway;
mod knowledge;
mod matcher;
mod notify;
mod shared;

// Shared
pub use shared::{CoreConfig, DEFAULT_CONFIG_PATH};

// Knowledge base
pub use knowledge::{KnowledgeError, KnowledgeStore, TopicRecord, NO_DESCRIPTION};

// Response matching
pub use matcher::ResponseMatcher;

// Notifications
pub use notify::{NotificationSink, NotifyError, ReqwestTransport, WebhookTransport, WEBHOOK_TIMEOUT};

// OSC gateway
pub use gateway::{
    expect_arity, string_arg, text_arg, ArgError, GatewayError, HandlerRegistry, OscHandler,
    OscOutbound, OscSender, ProtocolGateway, UdpOutbound,
};

/// Re-exported so handlers and tests can build OSC arguments without a direct `rosc` dependency.
pub use rosc::{OscMessage, OscPacket, OscType};
