//! Service configuration shared by the core and the gateway binary.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file used when neither `--config` nor `VRC_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

const DEFAULT_OSC_SERVER_IP: &str = "0.0.0.0";
const DEFAULT_OSC_SERVER_PORT: u16 = 9001;
const DEFAULT_VRCHAT_CLIENT_IP: &str = "127.0.0.1";
const DEFAULT_VRCHAT_CLIENT_PORT: u16 = 9000;
const DEFAULT_KNOWLEDGE_BASE_FILE: &str = "knowledge_base.json";
const DEFAULT_WEB_SERVER_HOST: &str = "127.0.0.1";
const DEFAULT_WEB_SERVER_PORT: u16 = 5000;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LOG_FILE: &str = "backend.log";

/// Bridge configuration. Load from JSON/TOML and `VRC__*` environment overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Host the inbound OSC listener binds (messages FROM VRChat).
    pub osc_server_ip: String,
    pub osc_server_port: u16,
    /// Host VRChat listens on for messages TO VRChat (usually localhost).
    pub vrchat_client_ip: String,
    pub vrchat_client_port: u16,
    /// Discord webhook URL. Empty disables notifications.
    #[serde(default)]
    pub discord_webhook_url: String,
    /// Mention tokens prepended to every notification (e.g. `<@12345>`).
    #[serde(default)]
    pub owner_discord_ids: Vec<String>,
    pub knowledge_base_file: String,
    pub web_server_host: String,
    pub web_server_port: u16,
    /// Default tracing filter when `RUST_LOG` is not set.
    pub log_level: String,
    /// Log file written alongside stdout. Empty disables file logging.
    pub log_file: String,
    /// When true, inbound OSC on addresses with no handler is logged instead of dropped silently.
    #[serde(default)]
    pub log_unrouted: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            osc_server_ip: DEFAULT_OSC_SERVER_IP.to_string(),
            osc_server_port: DEFAULT_OSC_SERVER_PORT,
            vrchat_client_ip: DEFAULT_VRCHAT_CLIENT_IP.to_string(),
            vrchat_client_port: DEFAULT_VRCHAT_CLIENT_PORT,
            discord_webhook_url: String::new(),
            owner_discord_ids: Vec::new(),
            knowledge_base_file: DEFAULT_KNOWLEDGE_BASE_FILE.to_string(),
            web_server_host: DEFAULT_WEB_SERVER_HOST.to_string(),
            web_server_port: DEFAULT_WEB_SERVER_PORT,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_file: DEFAULT_LOG_FILE.to_string(),
            log_unrouted: false,
        }
    }
}

impl CoreConfig {
    /// Load config from `path` (if it exists) and the environment.
    /// Precedence: env `VRC__<FIELD>` > file > defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("osc_server_ip", DEFAULT_OSC_SERVER_IP)?
            .set_default("osc_server_port", i64::from(DEFAULT_OSC_SERVER_PORT))?
            .set_default("vrchat_client_ip", DEFAULT_VRCHAT_CLIENT_IP)?
            .set_default("vrchat_client_port", i64::from(DEFAULT_VRCHAT_CLIENT_PORT))?
            .set_default("knowledge_base_file", DEFAULT_KNOWLEDGE_BASE_FILE)?
            .set_default("web_server_host", DEFAULT_WEB_SERVER_HOST)?
            .set_default("web_server_port", i64::from(DEFAULT_WEB_SERVER_PORT))?
            .set_default("log_level", DEFAULT_LOG_LEVEL)?
            .set_default("log_file", DEFAULT_LOG_FILE)?;

        let path = path.as_ref();
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("VRC").separator("__"))
            .build()?;

        built.try_deserialize()
    }

    /// Writes the default configuration to `path`: TOML for a `.toml` extension, pretty JSON
    /// otherwise, matching the format [`load`](Self::load) picks for that path.
    pub fn write_default<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
        let path = path.as_ref();
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let body = if is_toml {
            toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?
        } else {
            serde_json::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, body)
    }

    /// Log file path, or `None` when file logging is disabled.
    pub fn log_file_path(&self) -> Option<&Path> {
        Some(self.log_file.trim())
            .filter(|p| !p.is_empty())
            .map(Path::new)
    }

    /// `host:port` the inbound OSC listener binds.
    pub fn inbound_addr(&self) -> String {
        format!("{}:{}", self.osc_server_ip, self.osc_server_port)
    }

    /// `host:port` outbound OSC messages are sent to.
    pub fn outbound_addr(&self) -> String {
        format!("{}:{}", self.vrchat_client_ip, self.vrchat_client_port)
    }

    /// `host:port` for the HTTP status server.
    pub fn web_addr(&self) -> String {
        format!("{}:{}", self.web_server_host, self.web_server_port)
    }

    /// Webhook URL, or `None` when notifications are disabled.
    pub fn webhook_url(&self) -> Option<&str> {
        Some(self.discord_webhook_url.trim()).filter(|u| !u.is_empty())
    }
}
