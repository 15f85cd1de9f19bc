//! VRChat OSC bridge: answers in-world chat from a knowledge base, alerts owners on item
//! interactions, and serves a small HTTP status page. Config-driven via CoreConfig.

mod handlers;
mod status;

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vrc_core::{
    CoreConfig, GatewayError, HandlerRegistry, KnowledgeStore, NotificationSink, OscSender, ProtocolGateway,
    ResponseMatcher, UdpOutbound, DEFAULT_CONFIG_PATH,
};

#[derive(Parser)]
#[command(name = "vrc-gateway")]
#[command(about = "VRChat AI backend service (OSC chat responder + Discord notifications)", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file (overrides $VRC_CONFIG; default: config.json)
    #[arg(long = "config", value_name = "PATH")]
    config_path: Option<PathBuf>,

    /// Enable debug logging (ignored when RUST_LOG is set)
    #[arg(long)]
    debug: bool,

    /// Pre-flight check: config, knowledge file and ports, then exit
    #[arg(long)]
    verify: bool,
}

/// What happened while locating the config file; logged once tracing is up.
enum ConfigOrigin {
    Loaded,
    CreatedDefault,
    CreateFailed(std::io::Error),
    Invalid(config::ConfigError),
}

/// Pre-flight check: config parses, knowledge file parses, and both ports are free.
fn run_verify(config_path: &Path) -> Result<(), String> {
    print!("Checking config {}... ", config_path.display());
    let config = CoreConfig::load(config_path).map_err(|e| format!("Config load failed: {}", e))?;
    println!("OK");

    print!("Checking knowledge base {}... ", config.knowledge_base_file);
    let topics = KnowledgeStore::read_file(&config.knowledge_base_file)
        .map_err(|e| format!("Knowledge base unusable: {}", e))?;
    println!("OK ({} topics)", topics.len());

    let inbound = config.inbound_addr();
    print!("Checking OSC port {}... ", inbound);
    match std::net::UdpSocket::bind(&inbound) {
        Ok(socket) => {
            drop(socket);
            println!("OK (available)");
        }
        Err(e) => return Err(format!("OSC port {} BLOCKED: {}", inbound, e)),
    }

    let web = config.web_addr();
    print!("Checking HTTP port {}... ", web);
    match std::net::TcpListener::bind(&web) {
        Ok(listener) => {
            drop(listener);
            println!("OK (available)");
        }
        Err(e) => return Err(format!("HTTP port {} BLOCKED: {}", web, e)),
    }

    match config.webhook_url() {
        Some(_) => println!("Discord notifications: enabled"),
        None => println!("Discord notifications: disabled (discord_webhook_url is empty)"),
    }

    println!("\n✅ SUCCESS: All systems GO. Ready to start the bridge.");
    Ok(())
}

fn load_config(path: &Path) -> (CoreConfig, ConfigOrigin) {
    let origin = if path.exists() {
        ConfigOrigin::Loaded
    } else {
        match CoreConfig::write_default(path) {
            Ok(()) => ConfigOrigin::CreatedDefault,
            Err(e) => ConfigOrigin::CreateFailed(e),
        }
    };
    match CoreConfig::load(path) {
        Ok(config) => (config, origin),
        Err(e) => (CoreConfig::default(), ConfigOrigin::Invalid(e)),
    }
}

/// Non-rotating appender for `path`; parent directories are created.
fn open_log_file(path: &Path) -> Result<(NonBlocking, WorkerGuard), InitError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "backend.log".to_string());
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Stdout plus the configured log file. Keep the returned guard alive until exit so buffered
/// file lines are flushed.
fn init_tracing(config: &CoreConfig, debug: bool) -> Option<WorkerGuard> {
    let default_filter = if debug { "debug".to_string() } else { config.log_level.clone() };

    let (file_layer, guard, file_error) = match config.log_file_path().map(open_log_file) {
        Some(Ok((writer, guard))) => (
            Some(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer)),
            Some(guard),
            None,
        ),
        Some(Err(e)) => (None, None, Some(e)),
        None => (None, None, None),
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or(default_filter),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    if let Some(e) = file_error {
        warn!("Log file '{}' unavailable, logging to stdout only: {}", config.log_file, e);
    }
    guard
}

fn log_config_origin(path: &Path, origin: ConfigOrigin, config: &CoreConfig) {
    match origin {
        ConfigOrigin::Loaded => info!("Configuration loaded from '{}'", path.display()),
        ConfigOrigin::CreatedDefault => warn!(
            "Config file '{}' not found. Created one with defaults; edit it to set discord_webhook_url and owner_discord_ids",
            path.display()
        ),
        ConfigOrigin::CreateFailed(e) => {
            error!("Config file '{}' not found and could not be created: {}. Using defaults", path.display(), e)
        }
        ConfigOrigin::Invalid(e) => error!("Error loading config '{}': {}. Using defaults", path.display(), e),
    }
    if config.webhook_url().is_none() {
        warn!("No Discord webhook URL configured. Notifications disabled.");
    }
    if config.owner_discord_ids.is_empty() {
        warn!("No owner Discord IDs configured. Notifications will not ping anyone.");
    }
}

async fn serve_status(app: axum::Router, addr: String, shutdown: CancellationToken) {
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            // The OSC bridge keeps running without its status page.
            error!("Failed to start web server on {}: {}", addr, e);
            return;
        }
    };
    info!("Web server started on http://{}", addr);
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
    {
        error!("Web server error: {}", e);
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[vrc-gateway] .env not loaded: {} (using system environment)", e);
    }

    let cli = Cli::parse();
    let config_path = cli
        .config_path
        .clone()
        .or_else(|| std::env::var_os("VRC_CONFIG").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    if cli.verify {
        match run_verify(&config_path) {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("❌ PRE-FLIGHT FAILED: {}", e);
                std::process::exit(1);
            }
        }
    }

    let (config, origin) = load_config(&config_path);
    let _log_guard = init_tracing(&config, cli.debug);
    info!("{}", "-".repeat(30));
    info!(" VRChat AI Backend Service ");
    info!("{}", "-".repeat(30));
    if cli.debug {
        info!("Debug mode enabled");
    }
    log_config_origin(&config_path, origin, &config);
    let config = Arc::new(config);

    let knowledge = Arc::new(KnowledgeStore::open_path(&config.knowledge_base_file));
    let matcher = Arc::new(ResponseMatcher::new(Arc::clone(&knowledge)));
    let sink = Arc::new(NotificationSink::from_config(&config));
    if sink.is_enabled() {
        info!("Discord integration initialized");
    }

    let outbound_addr = config.outbound_addr();
    let sender = match UdpOutbound::connect(&outbound_addr).await {
        Ok(outbound) => {
            info!("OSC client initialized to send to VRChat at {}", outbound.peer());
            OscSender::new(Arc::new(outbound))
        }
        Err(e) => {
            error!("Error initializing OSC client for {}: {}", outbound_addr, e);
            OscSender::disconnected()
        }
    };

    let osc_connected = sender.is_connected();
    let mut registry = HandlerRegistry::new();
    handlers::register_default_handlers(&mut registry, matcher, sender, Arc::clone(&sink));

    let shutdown = CancellationToken::new();
    let gateway = ProtocolGateway::new(config.inbound_addr(), Arc::new(registry), shutdown.clone())
        .with_unrouted_logging(config.log_unrouted);

    if let Err(e) = gateway.start().await {
        error!("Error starting OSC server on {}: {}", config.inbound_addr(), e);
        if let GatewayError::Bind { .. } = e {
            error!(
                "Is another application already using port {}? Check your config if the IP/port needs changing.",
                config.osc_server_port
            );
        }
        std::process::exit(1);
    }

    let app = status::build_app(status::AppState {
        config: Arc::clone(&config),
        knowledge,
        notifications_enabled: sink.is_enabled(),
        osc_connected,
    });
    let web = tokio::spawn(serve_status(app, config.web_addr(), shutdown.clone()));

    info!("Backend service running. Press Ctrl+C to exit.");
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down..."),
        Err(e) => error!("Unable to listen for shutdown signal: {}", e),
    }

    shutdown.cancel();
    gateway.stop().await;
    if let Err(e) = web.await {
        warn!("Web server task ended abnormally: {}", e);
    }
    info!("Backend service stopped.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_parse() {
        let cli = Cli::try_parse_from(["vrc-gateway", "--config", "bridge.toml", "--debug"]).unwrap();
        assert_eq!(cli.config_path, Some(PathBuf::from("bridge.toml")));
        assert!(cli.debug);
        assert!(!cli.verify);
    }

    #[test]
    fn missing_config_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let (config, origin) = load_config(&path);
        assert!(matches!(origin, ConfigOrigin::CreatedDefault));
        assert!(path.exists());
        assert_eq!(config, CoreConfig::default());

        let (_, origin) = load_config(&path);
        assert!(matches!(origin, ConfigOrigin::Loaded));
    }

    #[test]
    fn missing_toml_config_is_created_as_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");

        let (config, origin) = load_config(&path);
        assert!(matches!(origin, ConfigOrigin::CreatedDefault));
        assert_eq!(config, CoreConfig::default());

        // Next start reads the file it wrote.
        let (config, origin) = load_config(&path);
        assert!(matches!(origin, ConfigOrigin::Loaded));
        assert_eq!(config, CoreConfig::default());
    }

    #[test]
    fn log_file_is_created_with_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("bridge.log");

        let (_writer, _guard) = open_log_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn invalid_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ broken").unwrap();

        let (config, origin) = load_config(&path);
        assert!(matches!(origin, ConfigOrigin::Invalid(_)));
        assert_eq!(config, CoreConfig::default());
    }

    #[test]
    fn verify_reports_missing_knowledge_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let kb = dir.path().join("absent.json");
        std::fs::write(
            &path,
            serde_json::json!({
                "knowledge_base_file": kb.display().to_string(),
                "osc_server_ip": "127.0.0.1",
                "osc_server_port": 0,
                "web_server_port": 0
            })
            .to_string(),
        )
        .unwrap();

        let err = run_verify(&path).unwrap_err();
        assert!(err.starts_with("Knowledge base unusable"), "{err}");
    }

    #[test]
    fn verify_passes_with_free_ports_and_valid_knowledge() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let kb = dir.path().join("kb.json");
        std::fs::write(&kb, r#"{"Bakery": {}}"#).unwrap();
        std::fs::write(
            &path,
            serde_json::json!({
                "knowledge_base_file": kb.display().to_string(),
                "osc_server_ip": "127.0.0.1",
                "osc_server_port": 0,
                "web_server_port": 0
            })
            .to_string(),
        )
        .unwrap();

        assert!(run_verify(&path).is_ok());
    }
}
