//! zufall-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert alle Nachrichten die zwischen Browser-Client und
//! Server ueber die WebSocket-Verbindung ausgetauscht werden, sowie den
//! Text-Frame-Codec.

pub mod control;
pub mod error;
pub mod wire;

pub use control::{ClientMessage, ErrorReason, ServerMessage, SessionInfo, STRANGER_LABEL};
pub use error::ProtokollFehler;
pub use wire::TextFrameCodec;
