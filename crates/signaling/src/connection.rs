//! Client-Connection – Verwaltet eine einzelne WebSocket-Verbindung
//!
//! Jede Verbindung laeuft in einem eigenen tokio-Task. Eingehende
//! Text-Frames werden dekodiert und dispatcht, ausgehende Nachrichten kommen
//! ausschliesslich aus der Send-Queue des Broadcasters.
//!
//! ## Ablauf
//! ```text
//! Upgrade -> Aufnahme (Ban-/Limit-Pruefung) -> welcome
//!     |                       |
//!     |                       +-- abgelehnt: Close ohne Begruendung
//!     v
//! Event-Schleife -> Close | Fehler | Shutdown | Rauswurf
//!     |
//!     v
//! client_trennen (Partner erhaelt partner_disconnected)
//! ```

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use zufall_protocol::control::ServerMessage;

use crate::broadcast::Ausgehend;
use crate::dispatcher::{DispatcherContext, MessageDispatcher};
use crate::server_state::SignalingState;

/// Verarbeitet eine einzelne WebSocket-Verbindung
pub struct ClientConnection {
    state: Arc<SignalingState>,
    origin: String,
}

impl ClientConnection {
    pub fn neu(state: Arc<SignalingState>, origin: String) -> Self {
        Self { state, origin }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis der Client trennt, gebannt wird oder das Shutdown-Signal
    /// eingeht.
    pub async fn verarbeiten(
        self,
        mut socket: WebSocket,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) {
        let (client_id, mut sende_rx) = match self.state.client_aufnehmen(&self.origin) {
            Ok(aufnahme) => aufnahme,
            Err(e) => {
                tracing::debug!(origin = %self.origin, fehler = %e, "Verbindung wird geschlossen");
                let _ = socket.send(Message::Close(None)).await;
                return;
            }
        };

        let ctx = DispatcherContext {
            client_id,
            origin: self.origin.clone(),
        };
        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));
        let (mut sink, mut stream) = socket.split();

        loop {
            tokio::select! {
                // Eingehender Frame vom Client
                frame = stream.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            match self.state.codec.dekodieren(&text) {
                                Ok(nachricht) => dispatcher.dispatch(nachricht, &ctx),
                                Err(e) => {
                                    tracing::debug!(client = %client_id, fehler = %e, "Ungueltiger Frame");
                                    self.state
                                        .broadcaster
                                        .an_client_senden(&client_id, ServerMessage::error(e.grund()));
                                }
                            }
                        }
                        Some(Ok(Message::Binary(daten))) => {
                            tracing::trace!(client = %client_id, bytes = daten.len(), "Binaer-Frame ignoriert");
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::debug!(client = %client_id, "Verbindung vom Client getrennt");
                            break;
                        }
                        // Ping/Pong beantwortet axum selbst
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::debug!(client = %client_id, fehler = %e, "WebSocket-Lesefehler");
                            break;
                        }
                    }
                }

                // Ausgehende Nachricht aus dem Broadcaster
                ausgehend = sende_rx.recv() => {
                    match ausgehend {
                        Some(Ausgehend::Nachricht(nachricht)) => {
                            let text = match self.state.codec.kodieren(&nachricht) {
                                Ok(text) => text,
                                Err(e) => {
                                    tracing::warn!(client = %client_id, fehler = %e, "Kodieren fehlgeschlagen");
                                    continue;
                                }
                            };
                            if let Err(e) = sink.send(Message::Text(text)).await {
                                tracing::debug!(client = %client_id, fehler = %e, "Senden fehlgeschlagen");
                                break;
                            }
                        }
                        Some(Ausgehend::Schliessen) => {
                            tracing::info!(client = %client_id, "Verbindung serverseitig geschlossen");
                            let _ = sink.send(Message::Close(None)).await;
                            break;
                        }
                        // Aus dem Broadcaster entfernt (z.B. Bann bei voller Queue)
                        None => {
                            tracing::info!(client = %client_id, "Send-Queue beendet – Verbindung wird geschlossen");
                            let _ = sink.send(Message::Close(None)).await;
                            break;
                        }
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::debug!(client = %client_id, "Shutdown-Signal – Verbindung wird getrennt");
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }

        dispatcher.client_cleanup(&ctx);
        tracing::debug!(client = %client_id, "Verbindungs-Task beendet");
    }
}
