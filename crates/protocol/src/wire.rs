//! Wire-Format fuer WebSocket-Verbindungen
//!
//! Jeder WebSocket-Text-Frame traegt genau eine JSON-Nachricht. Der Codec
//! prueft die Frame-Groesse bevor geparst wird.

use crate::control::{ClientMessage, ServerMessage};
use crate::error::ProtokollFehler;

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Frame-Groesse (64 KiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// TextFrameCodec
// ---------------------------------------------------------------------------

/// Codec fuer JSON-Text-Frames
#[derive(Debug, Clone)]
pub struct TextFrameCodec {
    /// Maximale erlaubte Frame-Groesse in Bytes
    max_frame_size: usize,
}

impl TextFrameCodec {
    /// Erstellt einen neuen `TextFrameCodec` mit Standard-Limits
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Erstellt einen `TextFrameCodec` mit benutzerdefinierter maximaler Frame-Groesse
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Gibt die konfigurierte maximale Frame-Groesse zurueck
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Dekodiert einen eingehenden Text-Frame
    pub fn dekodieren(&self, frame: &str) -> Result<ClientMessage, ProtokollFehler> {
        if frame.len() > self.max_frame_size {
            return Err(ProtokollFehler::FrameZuGross {
                groesse: frame.len(),
                maximum: self.max_frame_size,
            });
        }
        ClientMessage::aus_json(frame)
    }

    /// Kodiert eine ausgehende Nachricht als Text-Frame
    ///
    /// Ausgehende Frames unterliegen keinem Groessenlimit.
    pub fn kodieren(&self, nachricht: &ServerMessage) -> Result<String, ProtokollFehler> {
        Ok(nachricht.to_json()?)
    }
}

impl Default for TextFrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
