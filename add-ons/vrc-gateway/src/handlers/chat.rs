//! Chat handler: answers `/vrchat/chat` from the knowledge base and shows the reply in the
//! avatar's Chatbox parameter.
//!
//! VRChat's Chatbox parameter takes a `true` trigger followed by the text, and displays at
//! most 144 characters.

use std::sync::Arc;
use tracing::{info, warn};
use vrc_core::{expect_arity, string_arg, text_arg, ArgError, OscHandler, OscSender, OscType, ResponseMatcher};

pub const CHAT_ADDRESS: &str = "/vrchat/chat";
pub const CHATBOX_ADDRESS: &str = "/avatar/parameters/Chatbox";
pub const CHATBOX_MAX_CHARS: usize = 144;

const ELLIPSIS: &str = "...";

pub struct ChatHandler {
    matcher: Arc<ResponseMatcher>,
    sender: OscSender,
}

impl ChatHandler {
    pub fn new(matcher: Arc<ResponseMatcher>, sender: OscSender) -> Self {
        Self { matcher, sender }
    }
}

#[async_trait::async_trait]
impl OscHandler for ChatHandler {
    fn address(&self) -> &str {
        CHAT_ADDRESS
    }

    async fn handle(&self, args: Vec<OscType>) -> Result<(), ArgError> {
        expect_arity(CHAT_ADDRESS, &args, 3)?;
        let player_name = text_arg(&args, 0, "playerName")?;
        let player_id = text_arg(&args, 1, "playerId")?;

        let message = match string_arg(&args, 2, "message") {
            Ok(s) if !s.trim().is_empty() => s.trim(),
            _ => {
                info!(target: "vrc::chat", player = %player_name, player_id = %player_id, "Empty or invalid chat message; ignoring");
                return Ok(());
            }
        };
        info!(target: "vrc::chat", player = %player_name, player_id = %player_id, text = %message, "Received chat");

        let reply = self.matcher.respond(&player_name, message);
        info!(target: "vrc::chat", player = %player_name, reply = %reply, "Generated response");

        let text = truncate_for_chatbox(&reply);
        if text != reply {
            warn!(target: "vrc::chat", max_chars = CHATBOX_MAX_CHARS, "Response truncated for VRChat Chatbox");
        }

        self.sender
            .send(CHATBOX_ADDRESS, vec![OscType::Bool(true), OscType::String(text)])
            .await;
        Ok(())
    }
}

/// Caps `reply` at [`CHATBOX_MAX_CHARS`] characters; longer text keeps its first 141
/// characters plus `...`.
pub fn truncate_for_chatbox(reply: &str) -> String {
    if reply.chars().count() <= CHATBOX_MAX_CHARS {
        return reply.to_string();
    }
    let keep = CHATBOX_MAX_CHARS - ELLIPSIS.len();
    let mut text: String = reply.chars().take(keep).collect();
    text.push_str(ELLIPSIS);
    text
}
