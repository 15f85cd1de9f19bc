//! OSC handlers served by the gateway.
//!
//! | Address               | Arguments                                    | Handler              |
//! |-----------------------|----------------------------------------------|----------------------|
//! | `/vrchat/chat`        | playerName, playerId, message                | [`ChatHandler`]      |
//! | `/vrchat/interaction` | itemId, itemName, playerName, playerId       | [`InteractionHandler`] |

mod chat;
mod interaction;

pub use chat::ChatHandler;
pub use interaction::InteractionHandler;

use std::sync::Arc;
use vrc_core::{HandlerRegistry, NotificationSink, OscSender, ResponseMatcher};

/// Registers the chat and interaction handlers.
pub fn register_default_handlers(
    registry: &mut HandlerRegistry,
    matcher: Arc<ResponseMatcher>,
    sender: OscSender,
    sink: Arc<NotificationSink>,
) {
    registry.register(Arc::new(ChatHandler::new(matcher, sender)));
    registry.register(Arc::new(InteractionHandler::new(sink)));
}

#[cfg(test)]
pub(crate) mod testing {
    //! Stubs shared by handler tests.

    use std::sync::Mutex;
    use vrc_core::{GatewayError, NotifyError, OscMessage, OscOutbound, WebhookTransport};

    #[derive(Default)]
    pub struct RecordingOutbound {
        pub sent: Mutex<Vec<OscMessage>>,
    }

    impl RecordingOutbound {
        pub fn sent(&self) -> Vec<OscMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl OscOutbound for RecordingOutbound {
        async fn transmit(&self, message: &OscMessage) -> Result<(), GatewayError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct RecordingWebhook {
        pub posts: Mutex<Vec<serde_json::Value>>,
    }

    impl RecordingWebhook {
        pub fn posts(&self) -> Vec<serde_json::Value> {
            self.posts.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl WebhookTransport for RecordingWebhook {
        async fn post_json(&self, _url: &str, payload: &serde_json::Value) -> Result<(), NotifyError> {
            self.posts.lock().unwrap().push(payload.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{RecordingOutbound, RecordingWebhook};
    use super::*;
    use vrc_core::{KnowledgeStore, OscMessage, OscType};

    #[tokio::test]
    async fn unregistered_address_sends_nothing_anywhere() {
        let outbound = Arc::new(RecordingOutbound::default());
        let webhook = Arc::new(RecordingWebhook::default());
        let sink = Arc::new(NotificationSink::new(
            Some("https://discord.example/hook".into()),
            Vec::new(),
            webhook.clone(),
        ));
        let matcher = Arc::new(ResponseMatcher::new(Arc::new(KnowledgeStore::new("unused.json"))));

        let mut registry = HandlerRegistry::new();
        register_default_handlers(&mut registry, matcher, OscSender::new(outbound.clone()), sink);
        assert_eq!(registry.addresses(), vec![chat::CHAT_ADDRESS, interaction::INTERACTION_ADDRESS]);

        let routed = registry
            .dispatch(OscMessage {
                addr: "/vrchat/emote".into(),
                args: vec![OscType::String("wave".into())],
            })
            .await;

        assert!(!routed);
        assert!(outbound.sent().is_empty());
        assert!(webhook.posts().is_empty());
    }
}
