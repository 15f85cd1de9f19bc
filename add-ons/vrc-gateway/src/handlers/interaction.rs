//! Interaction handler: world items report `/vrchat/interaction` and owners get a Discord alert.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use vrc_core::{expect_arity, text_arg, ArgError, NotificationSink, OscHandler, OscType};

pub const INTERACTION_ADDRESS: &str = "/vrchat/interaction";

pub struct InteractionHandler {
    sink: Arc<NotificationSink>,
}

impl InteractionHandler {
    pub fn new(sink: Arc<NotificationSink>) -> Self {
        Self { sink }
    }
}

#[async_trait::async_trait]
impl OscHandler for InteractionHandler {
    fn address(&self) -> &str {
        INTERACTION_ADDRESS
    }

    async fn handle(&self, args: Vec<OscType>) -> Result<(), ArgError> {
        expect_arity(INTERACTION_ADDRESS, &args, 4)?;
        let item_id = text_arg(&args, 0, "itemId")?;
        let item_name = text_arg(&args, 1, "itemName")?;
        let player_name = text_arg(&args, 2, "playerName")?;
        let player_id = text_arg(&args, 3, "playerId")?;

        info!(
            target: "vrc::interaction",
            item = %item_name, item_id = %item_id, player = %player_name, player_id = %player_id,
            "Received interaction"
        );

        let alert = alert_text(&item_id, &item_name, &player_name, &player_id, Utc::now());
        self.sink.notify(&alert).await;
        Ok(())
    }
}

/// Discord-markdown alert for one interaction.
pub fn alert_text(item_id: &str, item_name: &str, player_name: &str, player_id: &str, at: DateTime<Utc>) -> String {
    format!(
        ":bell: **Item Interaction Alert** ({} UTC)\n> **Player:** `{}` (ID: `{}`)\n> **Item:** `{}` (ID: `{}`)",
        at.format("%Y-%m-%d %H:%M:%S"),
        player_name,
        player_id,
        item_name,
        item_id,
    )
}
