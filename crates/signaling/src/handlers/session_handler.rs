//! Session-Handler – Warteschlange, Signal-Relay und Chat

use serde_json::value::RawValue;
use zufall_core::types::ClientId;

use crate::server_state::SignalingState;

/// `join_queue` und `next`
///
/// Beide Events loesen denselben Uebergang aus: bestehende Paarung loesen
/// und neu einreihen.
pub fn handle_partner_anfordern(client_id: ClientId, state: &SignalingState) {
    tracing::debug!(client = %client_id, "Partner angefordert");
    state.partner_anfordern(client_id);
}

/// `signal` – opake Handshake-Daten an einen bestimmten Client
pub fn handle_signal(
    client_id: ClientId,
    an: ClientId,
    signal: Box<RawValue>,
    state: &SignalingState,
) {
    tracing::trace!(von = %client_id, an = %an, bytes = signal.get().len(), "Signal empfangen");
    state.signal_weiterleiten(client_id, an, signal);
}

/// `send_message` – Chat-Text an den aktuellen Partner
pub fn handle_chat(client_id: ClientId, text: String, state: &SignalingState) {
    tracing::trace!(client = %client_id, laenge = text.len(), "Chat-Nachricht empfangen");
    state.chat_weiterleiten(client_id, text);
}
