//! Moderations-Kanal
//!
//! Ein Moderator ist eine normale Verbindung, die das gemeinsame Geheimnis
//! kennt. Die Berechtigung gilt nur fuer diese Verbindung und wird nirgends
//! gespeichert. Moderatoren erhalten periodische Presence-Snapshots und
//! duerfen Clients bannen.

use std::sync::Arc;
use std::time::Duration;

use zufall_protocol::control::{ServerMessage, SessionInfo};

use crate::server_state::SignalingState;

// ---------------------------------------------------------------------------
// ModeratorAuth
// ---------------------------------------------------------------------------

/// Prueft das Moderator-Geheimnis
#[derive(Clone)]
pub struct ModeratorAuth {
    passwort: String,
}

impl ModeratorAuth {
    /// Ein leeres Passwort deaktiviert den Moderator-Login
    pub fn neu(passwort: impl Into<String>) -> Self {
        Self {
            passwort: passwort.into(),
        }
    }

    pub fn ist_aktiv(&self) -> bool {
        !self.passwort.is_empty()
    }

    /// Vergleicht in konstanter Zeit (bezogen auf gleich lange Eingaben)
    pub fn pruefen(&self, eingabe: &str) -> bool {
        if !self.ist_aktiv() {
            return false;
        }
        let erwartet = self.passwort.as_bytes();
        let eingabe = eingabe.as_bytes();

        eingabe.len() == erwartet.len()
            && eingabe
                .iter()
                .zip(erwartet)
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }
}

impl std::fmt::Debug for ModeratorAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeratorAuth")
            .field("aktiv", &self.ist_aktiv())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// PresenceSnapshot
// ---------------------------------------------------------------------------

/// Zeitpunkt-konsistente Sicht auf alle verbundenen Clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceSnapshot {
    pub total_online: usize,
    pub sessions: Vec<SessionInfo>,
}

impl PresenceSnapshot {
    pub fn als_nachricht(&self) -> ServerMessage {
        ServerMessage::StatsUpdate {
            online_count: self.total_online,
            users: self.sessions.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot-Task
// ---------------------------------------------------------------------------

/// Startet den periodischen Snapshot-Versand an alle Moderatoren
///
/// Der Task endet sobald das Shutdown-Signal gesetzt wird.
pub fn snapshot_task_starten(
    state: Arc<SignalingState>,
    intervall: Duration,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(intervall);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await; // Ersten Tick ueberspringen

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let empfaenger = state.snapshot_senden();
                    if empfaenger > 0 {
                        tracing::trace!(moderatoren = empfaenger, "Presence-Snapshot gesendet");
                    }
                }
                ergebnis = shutdown_rx.changed() => {
                    if ergebnis.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::debug!("Snapshot-Task beendet");
    })
}
