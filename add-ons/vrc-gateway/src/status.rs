//! Read-only HTTP status surface (plus an explicit knowledge reload).

use axum::{extract::State, routing::get, routing::post, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use vrc_core::{CoreConfig, KnowledgeStore};

const INDEX_TEXT: &str = "VRChat AI Backend Service is running. See /status for details.";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) config: Arc<CoreConfig>,
    pub(crate) knowledge: Arc<KnowledgeStore>,
    pub(crate) notifications_enabled: bool,
    /// False when the outbound OSC client failed to initialize; chat replies are then dropped.
    pub(crate) osc_connected: bool,
}

pub(crate) fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/status", get(status))
        .route("/api/v1/health", get(health))
        .route("/api/v1/knowledge/reload", post(reload_knowledge))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// GET / – plain-text liveness for browsers.
async fn index() -> &'static str {
    INDEX_TEXT
}

/// GET /api/v1/health – liveness check for scripts.
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

/// GET /status – bind addresses, outbound client and notification state, loaded topics.
async fn status(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "running",
        "osc_listening_on": state.config.inbound_addr(),
        "sending_osc_to": state.config.outbound_addr(),
        "osc_client_initialized": state.osc_connected,
        "discord_notifications_enabled": state.notifications_enabled,
        "knowledge_base_file": state.knowledge.path().display().to_string(),
        "knowledge_base_topics_loaded": state.knowledge.topics(),
    }))
}

/// POST /api/v1/knowledge/reload – re-reads the knowledge file, swapping the table atomically.
async fn reload_knowledge(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    let count = state.knowledge.reload();
    info!(target: "vrc::status", topics = count, "Knowledge base reloaded via HTTP");
    axum::Json(serde_json::json!({
        "status": "reloaded",
        "topics": state.knowledge.topics(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_state(kb_path: &std::path::Path, notifications_enabled: bool) -> AppState {
        AppState {
            config: Arc::new(CoreConfig {
                osc_server_port: 9101,
                vrchat_client_ip: "192.168.1.20".to_string(),
                knowledge_base_file: kb_path.display().to_string(),
                ..CoreConfig::default()
            }),
            knowledge: Arc::new(KnowledgeStore::open_path(kb_path)),
            notifications_enabled,
            osc_connected: true,
        }
    }

    async fn body_json(res: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn index_is_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_app(test_state(&dir.path().join("kb.json"), false));
        let res = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], INDEX_TEXT.as_bytes());
    }

    #[tokio::test]
    async fn status_reports_addresses_and_topics() {
        let dir = tempfile::tempdir().unwrap();
        let kb = dir.path().join("kb.json");
        std::fs::write(&kb, r#"{"Bakery": {}, "Gym": {}}"#).unwrap();
        let app = build_app(test_state(&kb, true));

        let res = app
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["status"], "running");
        assert_eq!(json["osc_listening_on"], "0.0.0.0:9101");
        assert_eq!(json["sending_osc_to"], "192.168.1.20:9000");
        assert_eq!(json["osc_client_initialized"], true);
        assert_eq!(json["discord_notifications_enabled"], true);
        assert_eq!(json["knowledge_base_file"], kb.display().to_string());
        assert_eq!(json["knowledge_base_topics_loaded"], serde_json::json!(["Bakery", "Gym"]));
    }

    #[tokio::test]
    async fn status_reports_disconnected_osc_client() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState {
            osc_connected: false,
            ..test_state(&dir.path().join("kb.json"), false)
        };
        let res = build_app(state)
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(res).await;
        assert_eq!(json["osc_client_initialized"], false);
        assert_eq!(json["knowledge_base_topics_loaded"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn health_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_app(test_state(&dir.path().join("kb.json"), false));
        let res = app
            .oneshot(Request::builder().uri("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(res).await, serde_json::json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn reload_picks_up_file_changes() {
        let dir = tempfile::tempdir().unwrap();
        let kb = dir.path().join("kb.json");
        std::fs::write(&kb, r#"{"Bakery": {}}"#).unwrap();
        let state = test_state(&kb, false);
        let knowledge = Arc::clone(&state.knowledge);
        let app = build_app(state);

        std::fs::write(&kb, r#"{"Gym": {}, "Pool": {}}"#).unwrap();
        let res = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/knowledge/reload")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["status"], "reloaded");
        assert_eq!(json["topics"], serde_json::json!(["Gym", "Pool"]));
        assert_eq!(knowledge.topics(), vec!["Gym", "Pool"]);
    }

    #[tokio::test]
    async fn reload_requires_post() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_app(test_state(&dir.path().join("kb.json"), false));
        let res = app
            .oneshot(Request::builder().uri("/api/v1/knowledge/reload").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
