//! HTTP route definitions

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::app::AppState;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router.
///
/// Every room is reachable at its own path; any other path is answered
/// with 404 before a WebSocket upgrade can happen.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new().route("/health", get(health_handler));

    for room in state.rooms.iter() {
        let room = room.clone();
        let path = room.path().to_string();
        let max_message_bytes = state.config.max_message_bytes;
        router = router.route(
            &path,
            get(move |ws: WebSocketUpgrade| ws_handler(ws, room.clone(), max_message_bytes)),
        );
    }

    router
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    rooms: Vec<RoomHealth>,
}

#[derive(Serialize)]
struct RoomHealth {
    name: String,
    path: String,
    players: usize,
    tick: u64,
    running: bool,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let rooms = state
        .rooms
        .iter()
        .map(|room| RoomHealth {
            name: room.name().to_string(),
            path: room.path().to_string(),
            players: room.session_count(),
            tick: room.tick_count(),
            running: room.is_running(),
        })
        .collect();

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        rooms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use futures::StreamExt;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    use tower::ServiceExt;

    fn test_config() -> Config {
        Config::from_lookup(|key| match key {
            "WORLD_SEED" => Some("5".to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn upgrade_request(path: &str) -> Request<Body> {
        Request::builder()
            .uri(path)
            .header(header::CONNECTION, "upgrade")
            .header(header::UPGRADE, "websocket")
            .header(header::SEC_WEBSOCKET_VERSION, "13")
            .header(header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ==")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn unknown_endpoint_is_refused_before_upgrade() {
        let state = AppState::new(test_config());
        let response = build_router(state.clone())
            .oneshot(upgrade_request("/pacman"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        state.shutdown();
    }

    #[tokio::test]
    async fn health_lists_every_room() {
        let state = AppState::new(test_config());
        let response = build_router(state.clone())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let paths: Vec<&str> = json["rooms"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["path"].as_str().unwrap())
            .collect();
        assert_eq!(paths, vec!["/ws", "/galaga", "/berzerk"]);
        state.shutdown();
    }

    #[tokio::test]
    async fn client_receives_init_then_game_state() {
        let state = AppState::new(test_config());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = build_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
            .await
            .unwrap();

        let mut texts = Vec::new();
        while texts.len() < 2 {
            let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            if let WsMessage::Text(text) = msg {
                texts.push(serde_json::from_str::<serde_json::Value>(&text).unwrap());
            }
        }

        assert_eq!(texts[0]["type"], "init");
        assert_eq!(texts[0]["room"], "asteroids");
        let id = texts[0]["id"].as_u64().unwrap();
        assert!(texts[0]["players"][id.to_string()].is_object());
        assert!(!texts[0]["asteroids"].as_array().unwrap().is_empty());
        assert_eq!(texts[1]["type"], "gameState");
        assert!(texts[1]["players"][id.to_string()].is_object());

        state.shutdown();
    }
}
