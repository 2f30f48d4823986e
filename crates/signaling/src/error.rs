//! Fehlertypen fuer den Signaling-Service
//!
//! Keiner dieser Fehler wird an Clients gemeldet. `NotFound` und
//! `Unauthenticated` werden lokal verworfen, `Banned`, `ServerVoll` und
//! `DuplicateIdentity` beenden die betroffene Verbindung ohne Begruendung.

use thiserror::Error;
use zufall_core::types::ClientId;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (Socket, Listener)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// ClientId ist bereits registriert (sollte nie auftreten)
    #[error("Identitaet bereits vergeben: {0}")]
    DuplicateIdentity(ClientId),

    /// Client ist (nicht mehr) registriert
    #[error("Client nicht gefunden: {0}")]
    NotFound(ClientId),

    /// Moderator-Aktion ohne erfolgreichen Login
    #[error("Nicht als Moderator angemeldet")]
    Unauthenticated,

    /// Origin ist gebannt
    #[error("Origin ist gebannt: {0}")]
    Banned(String),

    /// Maximale Clientanzahl erreicht
    #[error("Server ist voll")]
    ServerVoll,
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
