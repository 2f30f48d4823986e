//! WebSocket-Listener – Bindet Socket, akzeptiert Verbindungen
//!
//! Der `SignalingServer` stellt einen axum-Router bereit:
//! - `GET /ws`      – WebSocket-Upgrade, pro Verbindung ein Task
//! - `GET /health`  – Health-Check
//! - `GET /metrics` – Prometheus-Metriken
//!
//! Die Origin eines Clients ist seine Peer-IP. Hinter einem Reverse-Proxy
//! kann stattdessen der erste `X-Forwarded-For`-Eintrag verwendet werden.

use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, State},
    http::{HeaderMap, HeaderValue, Method},
    response::Response,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use zufall_observability::{observability_router, request_timing_layer, HealthState};

use crate::connection::ClientConnection;
use crate::error::SignalingResult;
use crate::server_state::SignalingState;

/// Netzwerk-Optionen des Signaling-Servers
#[derive(Debug, Clone)]
pub struct NetzwerkKonfig {
    /// Erlaubte CORS-Origins. Leer = alle Origins erlaubt.
    pub cors_origins: Vec<String>,
    /// `X-Forwarded-For` als Origin verwenden
    pub proxy_header_vertrauen: bool,
}

/// Axum-State des WebSocket-Endpunkts
#[derive(Clone)]
struct WsState {
    state: Arc<SignalingState>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
    proxy_header_vertrauen: bool,
}

/// WebSocket-Signaling-Server
pub struct SignalingServer {
    state: Arc<SignalingState>,
    konfig: NetzwerkKonfig,
    health: HealthState,
}

impl SignalingServer {
    pub fn neu(state: Arc<SignalingState>, konfig: NetzwerkKonfig, health: HealthState) -> Self {
        Self {
            state,
            konfig,
            health,
        }
    }

    /// Baut den vollstaendigen Router
    pub fn router(&self, shutdown_rx: tokio::sync::watch::Receiver<bool>) -> Router {
        let cors = if self.konfig.cors_origins.is_empty() {
            CorsLayer::permissive()
        } else {
            let origins: Vec<HeaderValue> = self
                .konfig
                .cors_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::OPTIONS])
                .allow_headers(tower_http::cors::Any)
        };

        let ws_state = WsState {
            state: Arc::clone(&self.state),
            shutdown_rx,
            proxy_header_vertrauen: self.konfig.proxy_header_vertrauen,
        };

        Router::new()
            .route("/ws", get(ws_handler))
            .with_state(ws_state)
            .merge(observability_router(
                self.state.metriken.clone(),
                self.health.clone(),
            ))
            .layer(request_timing_layer())
            .layer(cors)
    }

    /// Bedient einen bereits gebundenen Listener
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
    pub async fn bedienen(
        self,
        listener: TcpListener,
        shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) -> SignalingResult<()> {
        let app = self.router(shutdown_rx.clone());
        let mut shutdown = shutdown_rx;

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
            tracing::info!("Signaling-Server: Shutdown-Signal empfangen");
        })
        .await?;

        tracing::info!("Signaling-Server gestoppt");
        Ok(())
    }
}

/// `GET /ws` – WebSocket-Upgrade
async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    State(ws_state): State<WsState>,
) -> Response {
    let origin = origin_ermitteln(&headers, peer, ws_state.proxy_header_vertrauen);
    let state = ws_state.state;
    let shutdown_rx = ws_state.shutdown_rx;

    // Zu grosse Frames sollen als `frame_too_large` beantwortet werden koennen,
    // erst deutlich groessere Frames beendet axum selbst.
    let transport_limit = state.config.max_frame_bytes.saturating_mul(4);

    ws.max_message_size(transport_limit)
        .max_frame_size(transport_limit)
        .on_upgrade(move |socket| async move {
            ClientConnection::neu(state, origin)
                .verarbeiten(socket, shutdown_rx)
                .await;
        })
}

/// Bestimmt die Origin einer Verbindung
pub fn origin_ermitteln(headers: &HeaderMap, peer: SocketAddr, proxy_header_vertrauen: bool) -> String {
    if proxy_header_vertrauen {
        let weitergeleitet = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty());
        if let Some(ip) = weitergeleitet {
            return ip.to_string();
        }
    }
    peer.ip().to_canonical().to_string()
}
