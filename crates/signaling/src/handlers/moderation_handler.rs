//! Moderations-Handler – Login und Ban

use zufall_core::types::ClientId;

use crate::error::SignalingError;
use crate::server_state::SignalingState;

/// `admin_login` – Ergebnis geht immer als `admin_auth_result` zurueck
pub fn handle_admin_login(client_id: ClientId, passwort: &str, state: &SignalingState) -> bool {
    state.moderator_anmelden(client_id, passwort)
}

/// `admin_ban_user` – ohne Login stillschweigend ignoriert
pub fn handle_admin_ban(client_id: ClientId, ziel: ClientId, state: &SignalingState) {
    match state.bannen(client_id, ziel) {
        Ok(()) => {}
        Err(SignalingError::Unauthenticated) => {
            tracing::debug!(client = %client_id, ziel = %ziel, "Ban ohne Moderator-Login ignoriert");
        }
        Err(SignalingError::NotFound(_)) => {
            tracing::debug!(client = %client_id, ziel = %ziel, "Ban-Ziel nicht verbunden");
        }
        Err(e) => {
            tracing::warn!(client = %client_id, ziel = %ziel, fehler = %e, "Ban fehlgeschlagen");
        }
    }
}
