//! Message-Dispatcher – Routet Client-Events an die richtigen Handler
//!
//! Alle Antworten laufen ueber die Send-Queue der Verbindung, damit sie in
//! derselben Reihenfolge ankommen wie Nachrichten anderer Ereignisse.
//!
//! ## Zustandspruefung
//! - `admin_ban_user` nur nach erfolgreichem `admin_login` auf derselben
//!   Verbindung, sonst stillschweigend ignoriert
//! - Alle anderen Events sind fuer jede aufgenommene Verbindung erlaubt

use std::sync::Arc;
use zufall_core::types::ClientId;
use zufall_protocol::control::ClientMessage;

use crate::handlers::{moderation_handler, session_handler};
use crate::server_state::SignalingState;

/// Dispatcher-Kontext – Informationen ueber die aktuelle Verbindung
#[derive(Debug, Clone)]
pub struct DispatcherContext {
    pub client_id: ClientId,
    /// Netzwerk-Herkunft, nur fuer Logging
    pub origin: String,
}

/// Zentraler Message-Dispatcher
pub struct MessageDispatcher {
    state: Arc<SignalingState>,
}

impl MessageDispatcher {
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    /// Verarbeitet ein eingehendes Event
    pub fn dispatch(&self, nachricht: ClientMessage, ctx: &DispatcherContext) {
        tracing::trace!(
            client = %ctx.client_id,
            event = nachricht.event_name(),
            "Event empfangen"
        );

        match nachricht {
            ClientMessage::JoinQueue | ClientMessage::Next => {
                session_handler::handle_partner_anfordern(ctx.client_id, &self.state);
            }
            ClientMessage::Signal { to, signal } => {
                session_handler::handle_signal(ctx.client_id, to, signal, &self.state);
            }
            ClientMessage::SendMessage { text } => {
                session_handler::handle_chat(ctx.client_id, text, &self.state);
            }
            ClientMessage::AdminLogin { passwort } => {
                let erfolg =
                    moderation_handler::handle_admin_login(ctx.client_id, &passwort, &self.state);
                if erfolg {
                    tracing::debug!(client = %ctx.client_id, origin = %ctx.origin, "Verbindung ist Moderator");
                }
            }
            ClientMessage::AdminBanUser { target } => {
                moderation_handler::handle_admin_ban(ctx.client_id, target, &self.state);
            }
        }
    }

    /// Aufraeumen beim Verbindungsende
    pub fn client_cleanup(&self, ctx: &DispatcherContext) {
        self.state.client_trennen(ctx.client_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::Ausgehend;
    use crate::server_state::SignalingConfig;
    use tokio::sync::mpsc;
    use zufall_observability::ZufallMetrics;
    use zufall_protocol::control::ServerMessage;

    fn verbinden(
        state: &Arc<SignalingState>,
        origin: &str,
    ) -> (DispatcherContext, mpsc::Receiver<Ausgehend>) {
        let (client_id, mut rx) = state.client_aufnehmen(origin).unwrap();
        // Welcome verwerfen
        rx.try_recv().unwrap();
        (
            DispatcherContext {
                client_id,
                origin: origin.to_string(),
            },
            rx,
        )
    }

    fn dekodieren(state: &SignalingState, frame: &str) -> ClientMessage {
        state.codec.dekodieren(frame).unwrap()
    }

    #[tokio::test]
    async fn join_queue_und_next_paaren() {
        let state = SignalingState::neu(SignalingConfig::default(), ZufallMetrics::neu().unwrap());
        let dispatcher = MessageDispatcher::neu(Arc::clone(&state));
        let (a, mut rx_a) = verbinden(&state, "1.1.1.1");
        let (b, mut rx_b) = verbinden(&state, "2.2.2.2");

        dispatcher.dispatch(dekodieren(&state, r#"{"event":"join_queue"}"#), &a);
        dispatcher.dispatch(dekodieren(&state, r#"{"event":"next"}"#), &b);

        assert!(matches!(
            rx_a.try_recv(),
            Ok(Ausgehend::Nachricht(ServerMessage::MatchFound { initiator: true, .. }))
        ));
        assert!(matches!(
            rx_b.try_recv(),
            Ok(Ausgehend::Nachricht(ServerMessage::MatchFound { initiator: false, .. }))
        ));
    }

    #[tokio::test]
    async fn ban_ohne_login_bleibt_folgenlos() {
        let state = SignalingState::neu(SignalingConfig::default(), ZufallMetrics::neu().unwrap());
        let dispatcher = MessageDispatcher::neu(Arc::clone(&state));
        let (a, mut rx_a) = verbinden(&state, "1.1.1.1");
        let (b, mut rx_b) = verbinden(&state, "2.2.2.2");

        let frame = format!(r#"{{"event":"admin_ban_user","data":"{}"}}"#, b.client_id.inner());
        dispatcher.dispatch(dekodieren(&state, &frame), &a);

        assert_eq!(state.online_anzahl(), 2);
        assert!(rx_a.try_recv().is_err(), "Keine Antwort an den Absender");
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn cleanup_entfernt_client() {
        let state = SignalingState::neu(SignalingConfig::default(), ZufallMetrics::neu().unwrap());
        let dispatcher = MessageDispatcher::neu(Arc::clone(&state));
        let (a, _rx_a) = verbinden(&state, "1.1.1.1");

        dispatcher.client_cleanup(&a);
        assert_eq!(state.online_anzahl(), 0);
    }
}
