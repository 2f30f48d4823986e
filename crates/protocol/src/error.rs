//! Fehlertypen fuer das Dekodieren eingehender Frames

use thiserror::Error;

use crate::control::ErrorReason;

/// Fehler beim Dekodieren oder Kodieren eines Frames
#[derive(Debug, Error)]
pub enum ProtokollFehler {
    /// Frame ueberschreitet die konfigurierte Maximalgroesse
    #[error("Frame zu gross: {groesse} Bytes (Maximum: {maximum} Bytes)")]
    FrameZuGross { groesse: usize, maximum: usize },

    /// Kein gueltiges JSON oder falsche Struktur
    #[error("JSON-Fehler: {0}")]
    Json(#[from] serde_json::Error),

    /// Event-Name ist unbekannt
    #[error("Unbekanntes Event: {0}")]
    UnbekanntesEvent(String),

    /// Event erwartet Daten, hat aber keine
    #[error("Event '{0}' ohne Daten")]
    FehlendeDaten(&'static str),
}

impl ProtokollFehler {
    /// Fehlergrund der an den Client zurueckgemeldet wird
    pub fn grund(&self) -> ErrorReason {
        match self {
            Self::FrameZuGross { .. } => ErrorReason::FrameTooLarge,
            _ => ErrorReason::InvalidMessage,
        }
    }
}
