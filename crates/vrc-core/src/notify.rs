//! Best-effort Discord webhook notifications. One POST per call, 10 s timeout, no retry;
//! failures are logged and swallowed.

use crate::shared::CoreConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound for a single webhook POST.
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("webhook transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("webhook returned HTTP {0}")]
    Status(u16),
}

/// Delivers a JSON payload to a webhook URL.
#[async_trait::async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post_json(&self, url: &str, payload: &serde_json::Value) -> Result<(), NotifyError>;
}

/// `reqwest`-backed transport with [`WEBHOOK_TIMEOUT`] applied to every request.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(WEBHOOK_TIMEOUT).build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl WebhookTransport for ReqwestTransport {
    async fn post_json(&self, url: &str, payload: &serde_json::Value) -> Result<(), NotifyError> {
        let resp = self.client.post(url).json(payload).send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::Status(status.as_u16()))
        }
    }
}

struct Endpoint {
    url: String,
    transport: Arc<dyn WebhookTransport>,
}

/// Fire-and-forget alert channel. Disabled when no webhook URL is configured.
pub struct NotificationSink {
    endpoint: Option<Endpoint>,
    mentions: Vec<String>,
}

impl NotificationSink {
    /// Sink posting to `url` through `transport`. `None` or a blank URL disables it.
    pub fn new(url: Option<String>, mentions: Vec<String>, transport: Arc<dyn WebhookTransport>) -> Self {
        let endpoint = url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .map(|url| Endpoint { url, transport });
        Self { endpoint, mentions }
    }

    /// Sink that never sends anything.
    pub fn disabled() -> Self {
        Self {
            endpoint: None,
            mentions: Vec::new(),
        }
    }

    /// Builds the production sink from config. A client that fails to build disables
    /// notifications rather than failing startup.
    pub fn from_config(config: &CoreConfig) -> Self {
        let Some(url) = config.webhook_url() else {
            return Self::disabled();
        };
        match ReqwestTransport::new() {
            Ok(transport) => Self::new(Some(url.to_string()), config.owner_discord_ids.clone(), Arc::new(transport)),
            Err(e) => {
                warn!(target: "vrc::notify", error = %e, "Webhook URL set but HTTP client failed to build; notifications disabled");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Webhook body: owner mentions (space-joined), newline, message; trimmed.
    pub fn payload(&self, message: &str) -> serde_json::Value {
        let content = format!("{}\n{}", self.mentions.join(" "), message);
        serde_json::json!({ "content": content.trim() })
    }

    /// Sends `message` once. Never returns an error; failures only produce a log line.
    pub async fn notify(&self, message: &str) {
        let Some(endpoint) = &self.endpoint else {
            debug!(target: "vrc::notify", "Webhook not configured; notification skipped");
            return;
        };
        let payload = self.payload(message);
        match endpoint.transport.post_json(&endpoint.url, &payload).await {
            Ok(()) => info!(target: "vrc::notify", "Discord notification sent"),
            Err(e) => warn!(target: "vrc::notify", error = %e, "Discord notification failed"),
        }
    }
}
