//! Event-Broadcaster – Ausgehende Send-Queues aller Verbindungen
//!
//! Jede Verbindung besitzt eine begrenzte mpsc-Queue. Der Kern reiht
//! Nachrichten nur per `try_send` ein und blockiert nie auf Socket-I/O.
//!
//! ## Selektives Senden
//! - An einen Client: `an_client_senden`
//! - An alle Moderatoren: `an_moderatoren_senden`
//! - Verbindung hinauswerfen: `rauswerfen`

use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use zufall_core::types::ClientId;
use zufall_protocol::control::ServerMessage;

/// Standard-Groesse der Send-Queue pro Client
pub const STANDARD_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// Ausgehend
// ---------------------------------------------------------------------------

/// Element der Send-Queue einer Verbindung
#[derive(Debug)]
pub enum Ausgehend {
    /// Nachricht als Text-Frame senden
    Nachricht(ServerMessage),
    /// Verbindung serverseitig schliessen
    Schliessen,
}

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue eines verbundenen Clients
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub client_id: ClientId,
    pub tx: mpsc::Sender<Ausgehend>,
}

impl ClientSender {
    /// Reiht ein Element nicht-blockierend ein
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, element: Ausgehend) -> bool {
        match self.tx.try_send(element) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(client_id = %self.client_id, "Send-Queue voll – Nachricht verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(client_id = %self.client_id, "Send-Queue geschlossen (Client getrennt)");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EventBroadcaster
// ---------------------------------------------------------------------------

/// Zentraler Broadcaster fuer alle Verbindungen
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct EventBroadcaster {
    inner: Arc<EventBroadcasterInner>,
}

struct EventBroadcasterInner {
    clients: DashMap<ClientId, ClientSender>,
    /// Verbindungen mit erfolgreichem Moderator-Login
    moderatoren: DashSet<ClientId>,
    queue_groesse: usize,
}

impl EventBroadcaster {
    /// Erstellt einen Broadcaster mit Standard-Queue-Groesse
    pub fn neu() -> Self {
        Self::mit_queue_groesse(STANDARD_QUEUE_GROESSE)
    }

    pub fn mit_queue_groesse(queue_groesse: usize) -> Self {
        Self {
            inner: Arc::new(EventBroadcasterInner {
                clients: DashMap::new(),
                moderatoren: DashSet::new(),
                queue_groesse: queue_groesse.max(1),
            }),
        }
    }

    /// Registriert einen Client und gibt seine Empfangs-Queue zurueck
    ///
    /// Die Verbindung liest aus dieser Queue und schreibt in den WebSocket.
    pub fn client_registrieren(&self, client_id: ClientId) -> mpsc::Receiver<Ausgehend> {
        let (tx, rx) = mpsc::channel(self.inner.queue_groesse);
        self.inner
            .clients
            .insert(client_id, ClientSender { client_id, tx });
        tracing::debug!(client_id = %client_id, "Client im Broadcaster registriert");
        rx
    }

    /// Entfernt einen Client (inklusive Moderator-Status)
    pub fn client_entfernen(&self, client_id: &ClientId) {
        self.inner.clients.remove(client_id);
        self.inner.moderatoren.remove(client_id);
        tracing::debug!(client_id = %client_id, "Client aus Broadcaster entfernt");
    }

    /// Sendet eine Nachricht an einen einzelnen Client
    pub fn an_client_senden(&self, client_id: &ClientId, nachricht: ServerMessage) -> bool {
        match self.inner.clients.get(client_id) {
            Some(sender) => sender.senden(Ausgehend::Nachricht(nachricht)),
            None => {
                tracing::debug!(client_id = %client_id, "Senden an unbekannten Client");
                false
            }
        }
    }

    /// Wirft eine Verbindung hinaus
    ///
    /// Reiht `Schliessen` ein und entfernt den Client danach aus dem
    /// Broadcaster. Mit dem letzten Sender endet auch die Queue: selbst wenn
    /// `Schliessen` wegen voller Queue verworfen wurde, liefert `recv()` nach
    /// den gepufferten Elementen `None` und die Verbindung schliesst.
    ///
    /// Gibt `true` zurueck wenn `Schliessen` eingereiht wurde.
    pub fn rauswerfen(&self, client_id: &ClientId) -> bool {
        let eingereiht = match self.inner.clients.get(client_id) {
            Some(sender) => sender.senden(Ausgehend::Schliessen),
            None => false,
        };
        self.client_entfernen(client_id);
        eingereiht
    }

    /// Markiert eine Verbindung als Moderator
    pub fn moderator_hinzufuegen(&self, client_id: ClientId) {
        if self.inner.clients.contains_key(&client_id) {
            self.inner.moderatoren.insert(client_id);
        }
    }

    pub fn ist_moderator(&self, client_id: &ClientId) -> bool {
        self.inner.moderatoren.contains(client_id)
    }

    /// Sendet eine Nachricht an alle Moderatoren
    ///
    /// Gibt die Anzahl erfolgreicher Sendungen zurueck.
    pub fn an_moderatoren_senden(&self, nachricht: &ServerMessage) -> usize {
        let mut gesendet = 0;
        for moderator in self.inner.moderatoren.iter() {
            if let Some(sender) = self.inner.clients.get(moderator.key()) {
                if sender.senden(Ausgehend::Nachricht(nachricht.clone())) {
                    gesendet += 1;
                }
            }
        }
        gesendet
    }

    pub fn client_anzahl(&self) -> usize {
        self.inner.clients.len()
    }

    pub fn moderator_anzahl(&self) -> usize {
        self.inner.moderatoren.len()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn client_registrieren_und_senden() {
        let broadcaster = EventBroadcaster::neu();
        let id = ClientId::new();

        let mut rx = broadcaster.client_registrieren(id);
        assert_eq!(broadcaster.client_anzahl(), 1);

        assert!(broadcaster.an_client_senden(&id, ServerMessage::PartnerDisconnected));
        match rx.try_recv().expect("Nachricht muss vorhanden sein") {
            Ausgehend::Nachricht(ServerMessage::PartnerDisconnected) => {}
            andere => panic!("Unerwartet: {:?}", andere),
        }
    }

    #[tokio::test]
    async fn volle_queue_verwirft_ohne_blockieren() {
        let broadcaster = EventBroadcaster::mit_queue_groesse(2);
        let id = ClientId::new();
        let _rx = broadcaster.client_registrieren(id);

        assert!(broadcaster.an_client_senden(&id, ServerMessage::PartnerDisconnected));
        assert!(broadcaster.an_client_senden(&id, ServerMessage::PartnerDisconnected));
        assert!(!broadcaster.an_client_senden(&id, ServerMessage::PartnerDisconnected));
    }

    #[tokio::test]
    async fn nur_moderatoren_erhalten_snapshots() {
        let broadcaster = EventBroadcaster::neu();
        let moderator = ClientId::new();
        let normal = ClientId::new();

        let mut rx_mod = broadcaster.client_registrieren(moderator);
        let mut rx_normal = broadcaster.client_registrieren(normal);
        broadcaster.moderator_hinzufuegen(moderator);
        assert!(broadcaster.ist_moderator(&moderator));
        assert!(!broadcaster.ist_moderator(&normal));

        let snapshot = ServerMessage::StatsUpdate {
            online_count: 2,
            users: Vec::new(),
        };
        assert_eq!(broadcaster.an_moderatoren_senden(&snapshot), 1);

        assert!(rx_mod.try_recv().is_ok());
        assert!(rx_normal.try_recv().is_err(), "Nicht-Moderator darf nichts empfangen");
    }

    #[tokio::test]
    async fn rauswerfen_reiht_schliessen_ein() {
        let broadcaster = EventBroadcaster::neu();
        let id = ClientId::new();
        let mut rx = broadcaster.client_registrieren(id);
        broadcaster.moderator_hinzufuegen(id);

        assert!(broadcaster.rauswerfen(&id));
        assert!(matches!(rx.recv().await, Some(Ausgehend::Schliessen)));
        assert!(rx.recv().await.is_none(), "Queue muss danach geschlossen sein");
        assert_eq!(broadcaster.client_anzahl(), 0);
        assert!(!broadcaster.ist_moderator(&id));

        assert!(!broadcaster.rauswerfen(&ClientId::new()));
    }

    #[tokio::test]
    async fn rauswerfen_bei_voller_queue_schliesst_trotzdem() {
        let broadcaster = EventBroadcaster::mit_queue_groesse(1);
        let id = ClientId::new();
        let mut rx = broadcaster.client_registrieren(id);
        assert!(broadcaster.an_client_senden(&id, ServerMessage::PartnerDisconnected));

        // Schliessen passt nicht mehr in die Queue
        assert!(!broadcaster.rauswerfen(&id));

        assert!(matches!(
            rx.recv().await,
            Some(Ausgehend::Nachricht(ServerMessage::PartnerDisconnected))
        ));
        assert!(rx.recv().await.is_none(), "Queue muss trotz Ueberlauf enden");
        assert!(!broadcaster.an_client_senden(&id, ServerMessage::PartnerDisconnected));
    }

    #[test]
    fn client_entfernen_bereinigt_moderator_status() {
        let broadcaster = EventBroadcaster::neu();
        let id = ClientId::new();

        let _rx = broadcaster.client_registrieren(id);
        broadcaster.moderator_hinzufuegen(id);
        assert_eq!(broadcaster.moderator_anzahl(), 1);

        broadcaster.client_entfernen(&id);
        assert_eq!(broadcaster.client_anzahl(), 0);
        assert!(!broadcaster.ist_moderator(&id));
    }
}
