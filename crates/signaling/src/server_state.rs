//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Der `Matchmaker` liegt hinter genau einem Mutex. Jede Operation nimmt den
//! Lock einmal, fuehrt den Uebergang inklusive Paarung aus und reiht die
//! resultierenden Nachrichten per `try_send` ein, bevor der Lock freigegeben
//! wird. Dadurch kommen Nachrichten pro Empfaenger in Ereignis-Reihenfolge an.

use parking_lot::Mutex;
use serde_json::value::RawValue;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use zufall_core::types::ClientId;
use zufall_observability::ZufallMetrics;
use zufall_protocol::control::ServerMessage;
use zufall_protocol::wire::{TextFrameCodec, DEFAULT_MAX_FRAME_SIZE};

use crate::broadcast::{Ausgehend, EventBroadcaster, STANDARD_QUEUE_GROESSE};
use crate::error::{SignalingError, SignalingResult};
use crate::lifecycle::{Ausgang, Matchmaker};
use crate::moderation::{ModeratorAuth, PresenceSnapshot};

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Maximale gleichzeitige Verbindungen
    pub max_clients: usize,
    /// Groesse der Send-Queue pro Verbindung
    pub sende_queue_groesse: usize,
    /// Maximale Groesse eingehender Text-Frames in Bytes
    pub max_frame_bytes: usize,
    /// Gemeinsames Moderator-Geheimnis (leer = deaktiviert)
    pub moderator_passwort: String,
    /// Intervall der Presence-Snapshots
    pub snapshot_intervall: Duration,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            max_clients: 1024,
            sende_queue_groesse: STANDARD_QUEUE_GROESSE,
            max_frame_bytes: DEFAULT_MAX_FRAME_SIZE,
            moderator_passwort: "admin123".to_string(),
            snapshot_intervall: Duration::from_secs(5),
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState {
    pub config: Arc<SignalingConfig>,
    /// Registry, Warteschlange und Bans
    kern: Mutex<Matchmaker>,
    /// Send-Queues aller Verbindungen
    pub broadcaster: EventBroadcaster,
    moderation: ModeratorAuth,
    pub metriken: ZufallMetrics,
    pub codec: TextFrameCodec,
    /// Startzeitpunkt des Servers (fuer Uptime-Berechnung)
    pub start_time: Instant,
}

impl SignalingState {
    /// Erstellt einen neuen SignalingState
    pub fn neu(config: SignalingConfig, metriken: ZufallMetrics) -> Arc<Self> {
        Arc::new(Self {
            broadcaster: EventBroadcaster::mit_queue_groesse(config.sende_queue_groesse),
            moderation: ModeratorAuth::neu(config.moderator_passwort.clone()),
            codec: TextFrameCodec::with_max_size(config.max_frame_bytes),
            config: Arc::new(config),
            kern: Mutex::new(Matchmaker::neu()),
            metriken,
            start_time: Instant::now(),
        })
    }

    // -----------------------------------------------------------------------
    // Verbindungen
    // -----------------------------------------------------------------------

    /// Nimmt eine neue Verbindung auf
    ///
    /// Bei Erfolg ist `welcome` bereits eingereiht. Ein Fehler bedeutet:
    /// Verbindung sofort schliessen, ohne dem Client einen Grund zu nennen.
    pub fn client_aufnehmen(
        &self,
        origin: &str,
    ) -> SignalingResult<(ClientId, mpsc::Receiver<Ausgehend>)> {
        let mut kern = self.kern.lock();

        if kern.registry().anzahl() >= self.config.max_clients {
            self.metriken.abgelehnte_verbindungen_total.inc();
            tracing::info!(origin = %origin, max = self.config.max_clients, "Server voll – Verbindung abgelehnt");
            return Err(SignalingError::ServerVoll);
        }

        let id = ClientId::new();
        if let Err(e) = kern.verbinden(id, origin) {
            self.metriken.abgelehnte_verbindungen_total.inc();
            tracing::info!(origin = %origin, fehler = %e, "Verbindung abgelehnt");
            return Err(e);
        }

        let rx = self.broadcaster.client_registrieren(id);
        self.broadcaster
            .an_client_senden(&id, ServerMessage::Welcome { client_id: id });
        self.metriken_aktualisieren(&kern);

        tracing::info!(client = %id, origin = %origin, "Client aufgenommen");
        Ok((id, rx))
    }

    /// Verbindung beendet (idempotent)
    pub fn client_trennen(&self, id: ClientId) {
        let mut kern = self.kern.lock();
        let war_online = kern.registry().ist_online(&id);
        let ausgaenge = kern.trennen(id);
        self.broadcaster.client_entfernen(&id);
        self.ausliefern(&kern, ausgaenge);

        if war_online {
            tracing::info!(client = %id, "Client getrennt");
        }
    }

    // -----------------------------------------------------------------------
    // Matchmaking und Relay
    // -----------------------------------------------------------------------

    /// `join_queue` und `next`: bestehende Paarung loesen, neu einreihen
    pub fn partner_anfordern(&self, id: ClientId) {
        let mut kern = self.kern.lock();
        let ausgaenge = kern.partner_anfordern(id);
        self.ausliefern(&kern, ausgaenge);
    }

    /// Leitet einen opaken Signal-Payload weiter
    pub fn signal_weiterleiten(&self, von: ClientId, an: ClientId, signal: Box<RawValue>) {
        let kern = self.kern.lock();
        let ausgang = kern.signal_weiterleiten(von, an, signal);
        self.ausliefern(&kern, ausgang.into_iter().collect());
    }

    /// Leitet Chat-Text an den Partner weiter
    pub fn chat_weiterleiten(&self, von: ClientId, text: String) {
        let kern = self.kern.lock();
        let ausgang = kern.chat_weiterleiten(von, text);
        self.ausliefern(&kern, ausgang.into_iter().collect());
    }

    // -----------------------------------------------------------------------
    // Moderation
    // -----------------------------------------------------------------------

    /// Moderator-Login fuer diese Verbindung
    ///
    /// Antwortet immer mit `admin_auth_result`.
    pub fn moderator_anmelden(&self, id: ClientId, passwort: &str) -> bool {
        let erfolg = self.moderation.pruefen(passwort);
        if erfolg {
            self.broadcaster.moderator_hinzufuegen(id);
            tracing::info!(client = %id, "Moderator angemeldet");
        } else {
            tracing::warn!(client = %id, "Moderator-Login fehlgeschlagen");
        }

        self.broadcaster
            .an_client_senden(&id, ServerMessage::AdminAuthResult { success: erfolg });
        erfolg
    }

    pub fn ist_moderator(&self, id: &ClientId) -> bool {
        self.broadcaster.ist_moderator(id)
    }

    /// Bannt die Origin des Ziels und wirft es hinaus
    pub fn bannen(&self, moderator: ClientId, ziel: ClientId) -> SignalingResult<()> {
        if !self.broadcaster.ist_moderator(&moderator) {
            return Err(SignalingError::Unauthenticated);
        }

        let mut kern = self.kern.lock();
        let ausgaenge = kern.bannen_und_entfernen(ziel)?;
        self.metriken.bans_total.inc();
        tracing::info!(moderator = %moderator, ziel = %ziel, "Client gebannt");
        self.ausliefern(&kern, ausgaenge);
        Ok(())
    }

    /// Konsistenter Snapshot unter dem Matchmaker-Lock
    pub fn snapshot(&self) -> PresenceSnapshot {
        self.kern.lock().snapshot()
    }

    /// Sendet einen Snapshot an alle Moderatoren
    ///
    /// Gibt die Anzahl erreichter Moderatoren zurueck.
    pub fn snapshot_senden(&self) -> usize {
        if self.broadcaster.moderator_anzahl() == 0 {
            return 0;
        }
        let snapshot = self.snapshot();
        self.broadcaster
            .an_moderatoren_senden(&snapshot.als_nachricht())
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    pub fn online_anzahl(&self) -> usize {
        self.kern.lock().registry().anzahl()
    }

    pub fn wartend(&self) -> Vec<ClientId> {
        self.kern.lock().warteschlange().ids()
    }

    pub fn partner_von(&self, id: &ClientId) -> Option<ClientId> {
        self.kern.lock().partner_von(id)
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    // -----------------------------------------------------------------------
    // Intern
    // -----------------------------------------------------------------------

    /// Reiht alle Ausgaenge ein; der Aufrufer haelt den Lock
    fn ausliefern(&self, kern: &Matchmaker, ausgaenge: Vec<Ausgang>) {
        for ausgang in ausgaenge {
            match ausgang {
                Ausgang::Senden { an, nachricht } => {
                    match &nachricht {
                        ServerMessage::MatchFound {
                            partner_id,
                            initiator: true,
                        } => {
                            self.metriken.paarungen_total.inc();
                            tracing::info!(initiator = %an, partner = %partner_id, "Paarung erstellt");
                        }
                        ServerMessage::Signal { .. } => self.metriken.signale_total.inc(),
                        ServerMessage::Message { .. } => self.metriken.chat_total.inc(),
                        ServerMessage::PartnerDisconnected => {
                            tracing::info!(client = %an, "Partner verloren");
                        }
                        _ => {}
                    }
                    self.broadcaster.an_client_senden(&an, nachricht);
                }
                Ausgang::Trennen { client } => {
                    self.broadcaster.rauswerfen(&client);
                }
            }
        }
        self.metriken_aktualisieren(kern);
    }

    fn metriken_aktualisieren(&self, kern: &Matchmaker) {
        self.metriken.zustand_setzen(
            kern.registry().anzahl(),
            kern.warteschlange().len(),
            kern.paar_anzahl(),
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state(config: SignalingConfig) -> Arc<SignalingState> {
        SignalingState::neu(config, ZufallMetrics::neu().unwrap())
    }

    fn naechste(rx: &mut mpsc::Receiver<Ausgehend>) -> ServerMessage {
        match rx.try_recv() {
            Ok(Ausgehend::Nachricht(n)) => n,
            andere => panic!("Nachricht erwartet, erhalten {:?}", andere),
        }
    }

    #[tokio::test]
    async fn aufnahme_sendet_welcome() {
        let state = test_state(SignalingConfig::default());
        let (id, mut rx) = state.client_aufnehmen("10.0.0.1").unwrap();

        match naechste(&mut rx) {
            ServerMessage::Welcome { client_id } => assert_eq!(client_id, id),
            andere => panic!("Welcome erwartet, erhalten {:?}", andere),
        }
        assert_eq!(state.online_anzahl(), 1);
        assert_eq!(state.metriken.online_clients.get(), 1);
    }

    #[tokio::test]
    async fn server_voll() {
        let state = test_state(SignalingConfig {
            max_clients: 1,
            ..Default::default()
        });
        let _a = state.client_aufnehmen("10.0.0.1").unwrap();
        let err = state.client_aufnehmen("10.0.0.2").unwrap_err();
        assert!(matches!(err, SignalingError::ServerVoll));
        assert_eq!(state.metriken.abgelehnte_verbindungen_total.get(), 1);
    }

    #[tokio::test]
    async fn bannen_ohne_login_wird_ignoriert() {
        let state = test_state(SignalingConfig::default());
        let (a, _rx_a) = state.client_aufnehmen("10.0.0.1").unwrap();
        let (b, _rx_b) = state.client_aufnehmen("10.0.0.2").unwrap();

        let err = state.bannen(a, b).unwrap_err();
        assert!(matches!(err, SignalingError::Unauthenticated));
        assert_eq!(state.online_anzahl(), 2);
        assert_eq!(state.metriken.bans_total.get(), 0);
    }

    #[tokio::test]
    async fn login_antwortet_immer() {
        let state = test_state(SignalingConfig::default());
        let (id, mut rx) = state.client_aufnehmen("10.0.0.1").unwrap();
        naechste(&mut rx);

        assert!(!state.moderator_anmelden(id, "falsch"));
        assert!(matches!(
            naechste(&mut rx),
            ServerMessage::AdminAuthResult { success: false }
        ));
        assert!(!state.ist_moderator(&id));

        assert!(state.moderator_anmelden(id, "admin123"));
        assert!(matches!(
            naechste(&mut rx),
            ServerMessage::AdminAuthResult { success: true }
        ));
        assert!(state.ist_moderator(&id));
    }

    #[tokio::test]
    async fn snapshot_nur_an_moderatoren() {
        let state = test_state(SignalingConfig::default());
        let (m, mut rx_m) = state.client_aufnehmen("10.0.0.1").unwrap();
        let (_c, mut rx_c) = state.client_aufnehmen("10.0.0.2").unwrap();
        naechste(&mut rx_m);
        naechste(&mut rx_c);

        assert_eq!(state.snapshot_senden(), 0);

        state.moderator_anmelden(m, "admin123");
        naechste(&mut rx_m);
        assert_eq!(state.snapshot_senden(), 1);

        match naechste(&mut rx_m) {
            ServerMessage::StatsUpdate {
                online_count,
                users,
            } => {
                assert_eq!(online_count, 2);
                assert_eq!(users[0].ip, "10.0.0.1");
                assert_eq!(users[1].ip, "10.0.0.2");
            }
            andere => panic!("StatsUpdate erwartet, erhalten {:?}", andere),
        }
        assert!(rx_c.try_recv().is_err());
    }

    #[tokio::test]
    async fn trennen_ist_idempotent() {
        let state = test_state(SignalingConfig::default());
        let (id, _rx) = state.client_aufnehmen("10.0.0.1").unwrap();

        state.client_trennen(id);
        state.client_trennen(id);
        assert_eq!(state.online_anzahl(), 0);
        assert_eq!(state.broadcaster.client_anzahl(), 0);
    }
}
