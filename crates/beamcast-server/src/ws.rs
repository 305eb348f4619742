//! WebSocket transport: one duplex text-frame channel per client.
//!
//! Routes:
//! - `GET /ws` - WebSocket upgrade handler
//! - `GET /health` - liveness probe with the current room count
//!
//! CORS is permissive because the endpoint carries no credentials; admission
//! is by room key, not by origin.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use beamcast_shared::constants::MAX_FRAME_BYTES;
use beamcast_shared::protocol::ClientFrame;

use crate::hub::Hub;

pub fn router(hub: Hub) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(hub)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    rooms: usize,
}

async fn health_check(State(hub): State<Hub>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        rooms: hub.room_count().await,
    })
}

async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<Hub>) -> impl IntoResponse {
    ws.max_message_size(MAX_FRAME_BYTES)
        .on_upgrade(move |socket| handle_socket(socket, hub))
}

/// Drive one client connection: register it, pump outbound frames from its
/// queue, parse inbound text frames, and run the detach path when the
/// transport closes.
async fn handle_socket(socket: WebSocket, hub: Hub) {
    let (client_id, mut outbound) = hub.register().await;
    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Failed to encode outbound frame");
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                // Peer is gone; the read half will surface the close.
                break;
            }
        }
    });

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientFrame>(&text) {
                Ok(frame) => hub.dispatch(client_id, frame).await,
                Err(e) => {
                    debug!(client = %client_id, error = %e, "Discarding malformed frame");
                }
            },
            Ok(Message::Close(_)) => break,
            // Binary frames and WebSocket-level ping/pong are not part of
            // the protocol; keep-alive is the application-level ping frame.
            Ok(_) => {}
            Err(e) => {
                debug!(client = %client_id, error = %e, "Transport error");
                break;
            }
        }
    }

    hub.disconnect(client_id).await;
    writer.abort();
}

/// Bind and serve until the process is shut down. With both TLS paths
/// configured the listener terminates TLS itself; otherwise it speaks
/// plain TCP (typical behind a reverse proxy).
pub async fn serve(hub: Hub) -> anyhow::Result<()> {
    let config = hub.config().clone();
    let addr = config.listen_addr;
    let app = router(hub);

    match config.tls_paths() {
        Some((cert, key)) => {
            let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key).await?;
            info!(addr = %addr, "Listening for WebSocket connections (TLS)");
            axum_server::bind_rustls(addr, tls)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            info!(addr = %addr, "Listening for WebSocket connections");
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_router() -> Router {
        router(Hub::new(ServerConfig::default()))
    }

    #[tokio::test]
    async fn test_health_endpoint_returns_200() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = test_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ws_route_requires_upgrade() {
        // A plain GET without the upgrade handshake must not be a 404.
        let request = Request::builder().uri("/ws").body(Body::empty()).unwrap();
        let response = test_router().oneshot(request).await.unwrap();
        assert_ne!(response.status(), StatusCode::NOT_FOUND);
        assert_ne!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cors_headers_present() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/health")
            .header("Origin", "http://example.com")
            .header("Access-Control-Request-Method", "GET")
            .body(Body::empty())
            .unwrap();
        let response = test_router().oneshot(request).await.unwrap();

        let cors_header = response
            .headers()
            .get("access-control-allow-origin")
            .map(|v| v.to_str().unwrap_or(""));
        assert_eq!(cors_header, Some("*"));
    }
}
