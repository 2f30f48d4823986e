//! Control-Protokoll (WebSocket)
//!
//! Definiert alle Nachrichten die ueber die WebSocket-Verbindung zwischen
//! Browser-Client und Server ausgetauscht werden.
//!
//! ## Design
//! - Jeder Frame ist ein Umschlag `{"event": "<name>", "data": <json>}`
//! - `data` fehlt bei Events ohne Nutzdaten
//! - Signaling-Payloads bleiben roher JSON-Text (`RawValue`) und werden
//!   byteweise unveraendert weitergereicht

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use zufall_core::types::ClientId;

use crate::error::ProtokollFehler;

/// Absender-Bezeichnung fuer weitergeleitete Chat-Nachrichten
///
/// Der Empfaenger erfaehrt nie die echte ClientId des Absenders.
pub const STRANGER_LABEL: &str = "stranger";

// ---------------------------------------------------------------------------
// Fehler-Gruende
// ---------------------------------------------------------------------------

/// Gruende fuer `error`-Events (nur fuer nicht dekodierbare Frames)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorReason {
    /// Frame ist kein gueltiger Umschlag oder Event unbekannt
    InvalidMessage,
    /// Frame ueberschreitet die Maximalgroesse
    FrameTooLarge,
}

impl std::fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorReason::InvalidMessage => write!(f, "invalid_message"),
            ErrorReason::FrameTooLarge => write!(f, "frame_too_large"),
        }
    }
}

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Nachrichten vom Client an den Server
#[derive(Debug, Clone)]
pub enum ClientMessage {
    /// In die Warteschlange einreihen (bestehende Paarung wird vorher geloest)
    JoinQueue,
    /// Aktuellen Partner ueberspringen und neu einreihen
    Next,
    /// Opake Handshake-Daten an einen bestimmten Client weiterleiten
    Signal { to: ClientId, signal: Box<RawValue> },
    /// Chat-Text an den aktuellen Partner
    SendMessage { text: String },
    /// Moderator-Login mit gemeinsamem Geheimnis
    AdminLogin { passwort: String },
    /// Moderator bannt einen Client (Origin-Ban + Rauswurf)
    AdminBanUser { target: ClientId },
}

/// Aeusserer Umschlag eines eingehenden Frames
#[derive(Deserialize)]
struct Umschlag {
    event: String,
    #[serde(default)]
    data: Option<Box<RawValue>>,
}

#[derive(Deserialize)]
struct SignalDaten {
    to: ClientId,
    signal: Box<RawValue>,
}

#[derive(Deserialize)]
struct TextDaten {
    text: String,
}

impl ClientMessage {
    /// Dekodiert einen JSON-Text-Frame
    pub fn aus_json(text: &str) -> Result<Self, ProtokollFehler> {
        let umschlag: Umschlag = serde_json::from_str(text)?;
        let daten = umschlag.data;

        let nachricht = match umschlag.event.as_str() {
            "join_queue" => ClientMessage::JoinQueue,
            "next" => ClientMessage::Next,
            "signal" => {
                let d: SignalDaten =
                    serde_json::from_str(daten.ok_or(ProtokollFehler::FehlendeDaten("signal"))?.get())?;
                ClientMessage::Signal {
                    to: d.to,
                    signal: d.signal,
                }
            }
            "send_message" => {
                let d: TextDaten = serde_json::from_str(
                    daten
                        .ok_or(ProtokollFehler::FehlendeDaten("send_message"))?
                        .get(),
                )?;
                ClientMessage::SendMessage { text: d.text }
            }
            "admin_login" => {
                let passwort: String = serde_json::from_str(
                    daten
                        .ok_or(ProtokollFehler::FehlendeDaten("admin_login"))?
                        .get(),
                )?;
                ClientMessage::AdminLogin { passwort }
            }
            "admin_ban_user" => {
                let target: ClientId = serde_json::from_str(
                    daten
                        .ok_or(ProtokollFehler::FehlendeDaten("admin_ban_user"))?
                        .get(),
                )?;
                ClientMessage::AdminBanUser { target }
            }
            andere => return Err(ProtokollFehler::UnbekanntesEvent(andere.to_string())),
        };

        Ok(nachricht)
    }

    /// Event-Name fuer Logging
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientMessage::JoinQueue => "join_queue",
            ClientMessage::Next => "next",
            ClientMessage::Signal { .. } => "signal",
            ClientMessage::SendMessage { .. } => "send_message",
            ClientMessage::AdminLogin { .. } => "admin_login",
            ClientMessage::AdminBanUser { .. } => "admin_ban_user",
        }
    }
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Eintrag im Presence-Snapshot fuer Moderatoren
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: ClientId,
    pub ip: String,
}

/// Nachrichten vom Server an den Client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Nach der Aufnahme: eigene ClientId
    Welcome { client_id: ClientId },
    /// Neue Paarung; genau eine Seite ist Initiator des Handshakes
    MatchFound { partner_id: ClientId, initiator: bool },
    /// Weitergeleitete Handshake-Daten (unveraendert)
    Signal { from: ClientId, signal: Box<RawValue> },
    /// Chat-Text vom Partner, Absender anonymisiert
    Message { from: String, text: String },
    /// Partner hat getrennt oder ist weitergezogen
    PartnerDisconnected,
    /// Ergebnis eines Moderator-Logins
    AdminAuthResult { success: bool },
    /// Periodischer Presence-Snapshot (nur Moderatoren)
    StatsUpdate {
        online_count: usize,
        users: Vec<SessionInfo>,
    },
    /// Frame konnte nicht verarbeitet werden
    Error { reason: ErrorReason },
}

impl ServerMessage {
    /// Erstellt eine anonymisierte Chat-Nachricht
    pub fn chat(text: impl Into<String>) -> Self {
        Self::Message {
            from: STRANGER_LABEL.to_string(),
            text: text.into(),
        }
    }

    /// Erstellt eine Fehlermeldung
    pub fn error(reason: ErrorReason) -> Self {
        Self::Error { reason }
    }

    /// Serialisiert die Nachricht als JSON-Text
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
