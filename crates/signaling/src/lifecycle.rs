//! Session-Lifecycle – Zustandsuebergaenge pro Client
//!
//! Der `Matchmaker` buendelt Registry, Warteschlange und Ban-Store. Alle
//! Uebergaenge sind synchrone Funktionen ohne I/O; sie liefern eine Liste
//! von `Ausgang`-Aktionen, die der Aufrufer ausliefert. Der Aufrufer haelt
//! dabei den Mutex um den gesamten `Matchmaker`, dadurch ist jedes Ereignis
//! inklusive nachfolgender Paarung eine unteilbare Einheit.
//!
//! ```text
//! Idle --partner_anfordern--> Queued --paaren--> Paired
//! Paired --partner_freigeben--> Idle        (Partner erhaelt partner_disconnected)
//! Paired --partner_anfordern--> Queued      (Partner erhaelt partner_disconnected)
//! *      --trennen-----------> entfernt
//! ```

use serde_json::value::RawValue;
use zufall_core::types::ClientId;
use zufall_protocol::control::ServerMessage;

use crate::ban_store::BanStore;
use crate::error::{SignalingError, SignalingResult};
use crate::moderation::PresenceSnapshot;
use crate::queue::{paaren, WaitQueue};
use crate::registry::{ConnectionRegistry, PresenceState};
use crate::relay;

// ---------------------------------------------------------------------------
// Ausgang
// ---------------------------------------------------------------------------

/// Aktion die nach einem Uebergang ausgefuehrt werden muss
#[derive(Debug)]
pub enum Ausgang {
    /// Nachricht an einen Client zustellen
    Senden { an: ClientId, nachricht: ServerMessage },
    /// Verbindung eines Clients zwangsweise schliessen
    Trennen { client: ClientId },
}

// ---------------------------------------------------------------------------
// Matchmaker
// ---------------------------------------------------------------------------

/// Gemeinsamer Zustand von Registry, Warteschlange und Bans
#[derive(Debug, Default)]
pub struct Matchmaker {
    registry: ConnectionRegistry,
    warteschlange: WaitQueue,
    bans: BanStore,
}

impl Matchmaker {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Nimmt eine neue Verbindung auf (Ban-Pruefung, dann Registry)
    pub fn verbinden(&mut self, id: ClientId, origin: &str) -> SignalingResult<()> {
        if self.bans.ist_gebannt(origin) {
            return Err(SignalingError::Banned(origin.to_string()));
        }
        self.registry.aufnehmen(id, origin)?;
        Ok(())
    }

    /// Client sucht einen (neuen) Partner
    ///
    /// Eine bestehende Paarung wird vorher geloest.
    pub fn partner_anfordern(&mut self, id: ClientId) -> Vec<Ausgang> {
        if !self.registry.ist_online(&id) {
            return Vec::new();
        }

        let mut ausgaenge = self.partner_freigeben(id);

        if self.registry.zustand_setzen(&id, PresenceState::Queued).is_ok() {
            self.warteschlange.einreihen(id);
        }

        ausgaenge.extend(self.paarung_auswerten());
        ausgaenge
    }

    /// Loest die Paarung bzw. verlaesst die Warteschlange
    ///
    /// Der verbleibende Partner wird `Idle` (nicht automatisch eingereiht)
    /// und erhaelt genau ein `partner_disconnected`.
    pub fn partner_freigeben(&mut self, id: ClientId) -> Vec<Ausgang> {
        let mut ausgaenge = Vec::new();

        match self.registry.zustand(&id) {
            Some(PresenceState::Paired { partner, .. }) => {
                let _ = self.registry.partner_setzen(&id, None);

                let partner_gehoert_zu_uns = self
                    .registry
                    .zustand(&partner)
                    .and_then(|z| z.partner())
                    == Some(id);
                if partner_gehoert_zu_uns && self.registry.partner_setzen(&partner, None).is_ok() {
                    tracing::debug!(client = %id, partner = %partner, "Paarung geloest");
                    ausgaenge.push(Ausgang::Senden {
                        an: partner,
                        nachricht: ServerMessage::PartnerDisconnected,
                    });
                }
            }
            Some(PresenceState::Queued) => {
                self.warteschlange.entfernen_falls_vorhanden(&id);
                let _ = self.registry.zustand_setzen(&id, PresenceState::Idle);
            }
            Some(PresenceState::Idle) | None => {}
        }

        ausgaenge
    }

    /// Verbindung geschlossen: Paarung loesen und aus der Registry entfernen
    ///
    /// Idempotent, ein zweiter Aufruf liefert keine Aktionen.
    pub fn trennen(&mut self, id: ClientId) -> Vec<Ausgang> {
        if !self.registry.ist_online(&id) {
            return Vec::new();
        }

        let mut ausgaenge = self.partner_freigeben(id);
        self.warteschlange.entfernen_falls_vorhanden(&id);
        self.registry.entfernen(&id);

        ausgaenge.extend(self.paarung_auswerten());
        ausgaenge
    }

    /// Leitet einen Signal-Payload weiter
    pub fn signal_weiterleiten(
        &self,
        von: ClientId,
        an: ClientId,
        signal: Box<RawValue>,
    ) -> Option<Ausgang> {
        relay::signal_weiterleiten(&self.registry, von, an, signal)
    }

    /// Leitet Chat-Text an den Partner weiter
    pub fn chat_weiterleiten(&self, von: ClientId, text: String) -> Option<Ausgang> {
        relay::chat_weiterleiten(&self.registry, von, text)
    }

    /// Bannt die Origin des Ziels und wirft es hinaus
    ///
    /// Laeuft ueber den normalen `trennen`-Uebergang, ein Partner erhaelt
    /// also `partner_disconnected`. Zusaetzlich wird die Verbindung des
    /// Ziels geschlossen.
    pub fn bannen_und_entfernen(&mut self, ziel: ClientId) -> SignalingResult<Vec<Ausgang>> {
        let origin = self.registry.nachschlagen(&ziel)?.origin.clone();
        self.bans.bannen(origin);

        let mut ausgaenge = self.trennen(ziel);
        ausgaenge.push(Ausgang::Trennen { client: ziel });
        Ok(ausgaenge)
    }

    /// Konsistenter Presence-Snapshot
    pub fn snapshot(&self) -> PresenceSnapshot {
        let sessions = self.registry.snapshot();
        PresenceSnapshot {
            total_online: sessions.len(),
            sessions,
        }
    }

    // -----------------------------------------------------------------------
    // Zugriff
    // -----------------------------------------------------------------------

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn warteschlange(&self) -> &WaitQueue {
        &self.warteschlange
    }

    pub fn bans(&self) -> &BanStore {
        &self.bans
    }

    /// Aktueller Partner eines Clients
    pub fn partner_von(&self, id: &ClientId) -> Option<ClientId> {
        self.registry.zustand(id).and_then(|z| z.partner())
    }

    /// Anzahl aktiver Paare
    pub fn paar_anzahl(&self) -> usize {
        self.registry.gepaart_anzahl() / 2
    }

    fn paarung_auswerten(&mut self) -> Vec<Ausgang> {
        paaren(&mut self.warteschlange, &mut self.registry)
            .into_iter()
            .flat_map(|p| {
                [
                    Ausgang::Senden {
                        an: p.initiator,
                        nachricht: ServerMessage::MatchFound {
                            partner_id: p.partner,
                            initiator: true,
                        },
                    },
                    Ausgang::Senden {
                        an: p.partner,
                        nachricht: ServerMessage::MatchFound {
                            partner_id: p.initiator,
                            initiator: false,
                        },
                    },
                ]
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn verbunden(mm: &mut Matchmaker, origin: &str) -> ClientId {
        let id = ClientId::new();
        mm.verbinden(id, origin).unwrap();
        id
    }

    fn partner_verloren_an(ausgaenge: &[Ausgang]) -> Vec<ClientId> {
        ausgaenge
            .iter()
            .filter_map(|a| match a {
                Ausgang::Senden {
                    an,
                    nachricht: ServerMessage::PartnerDisconnected,
                } => Some(*an),
                _ => None,
            })
            .collect()
    }

    fn match_found(ausgaenge: &[Ausgang]) -> Vec<(ClientId, ClientId, bool)> {
        ausgaenge
            .iter()
            .filter_map(|a| match a {
                Ausgang::Senden {
                    an,
                    nachricht:
                        ServerMessage::MatchFound {
                            partner_id,
                            initiator,
                        },
                } => Some((*an, *partner_id, *initiator)),
                _ => None,
            })
            .collect()
    }

    /// Prueft Symmetrie sowie Queued <=> in der Warteschlange
    fn invarianten_pruefen(mm: &Matchmaker) {
        for info in mm.registry().snapshot() {
            let zustand = mm.registry().zustand(&info.id).unwrap();
            assert_eq!(
                zustand == PresenceState::Queued,
                mm.warteschlange().enthaelt(&info.id),
                "Queued und Warteschlange divergieren fuer {}",
                info.id
            );
            if let Some(partner) = zustand.partner() {
                assert_eq!(mm.partner_von(&partner), Some(info.id));
            }
        }
        assert!(mm.warteschlange().len() <= 1);
    }

    #[test]
    fn zwei_anfragen_ergeben_paar() {
        let mut mm = Matchmaker::neu();
        let a = verbunden(&mut mm, "1.1.1.1");
        let b = verbunden(&mut mm, "2.2.2.2");

        assert!(mm.partner_anfordern(a).is_empty());
        let ausgaenge = mm.partner_anfordern(b);

        assert_eq!(match_found(&ausgaenge), vec![(a, b, true), (b, a, false)]);
        assert_eq!(mm.partner_von(&a), Some(b));
        assert_eq!(mm.partner_von(&b), Some(a));
        assert_eq!(mm.paar_anzahl(), 1);
        invarianten_pruefen(&mm);
    }

    #[test]
    fn erneute_anfrage_in_warteschlange_ist_idempotent() {
        let mut mm = Matchmaker::neu();
        let a = verbunden(&mut mm, "1.1.1.1");

        mm.partner_anfordern(a);
        mm.partner_anfordern(a);
        assert_eq!(mm.warteschlange().ids(), vec![a]);
        invarianten_pruefen(&mm);
    }

    #[test]
    fn trennen_benachrichtigt_partner_genau_einmal() {
        let mut mm = Matchmaker::neu();
        let a = verbunden(&mut mm, "1.1.1.1");
        let b = verbunden(&mut mm, "2.2.2.2");
        mm.partner_anfordern(a);
        mm.partner_anfordern(b);

        let ausgaenge = mm.trennen(a);
        assert_eq!(partner_verloren_an(&ausgaenge), vec![b]);
        assert_eq!(mm.registry().zustand(&b), Some(PresenceState::Idle));
        assert!(!mm.warteschlange().enthaelt(&b));

        // Zweiter Aufruf ist ein No-Op
        assert!(mm.trennen(a).is_empty());
        invarianten_pruefen(&mm);
    }

    #[test]
    fn next_wechselt_direkt_zum_naechsten_partner() {
        let mut mm = Matchmaker::neu();
        let a = verbunden(&mut mm, "1.1.1.1");
        let b = verbunden(&mut mm, "2.2.2.2");
        let c = verbunden(&mut mm, "3.3.3.3");
        mm.partner_anfordern(a);
        mm.partner_anfordern(b);
        mm.partner_anfordern(c);

        // A ueberspringt B und wird sofort mit C gepaart
        let ausgaenge = mm.partner_anfordern(a);
        assert_eq!(partner_verloren_an(&ausgaenge), vec![b]);
        assert_eq!(match_found(&ausgaenge), vec![(c, a, true), (a, c, false)]);
        assert_eq!(mm.registry().zustand(&b), Some(PresenceState::Idle));
        invarianten_pruefen(&mm);
    }

    #[test]
    fn freigeben_aus_warteschlange() {
        let mut mm = Matchmaker::neu();
        let a = verbunden(&mut mm, "1.1.1.1");
        mm.partner_anfordern(a);

        assert!(mm.partner_freigeben(a).is_empty());
        assert!(mm.warteschlange().is_empty());
        assert_eq!(mm.registry().zustand(&a), Some(PresenceState::Idle));
    }

    #[test]
    fn trennen_eines_wartenden() {
        let mut mm = Matchmaker::neu();
        let a = verbunden(&mut mm, "1.1.1.1");
        mm.partner_anfordern(a);

        assert!(mm.trennen(a).is_empty());
        assert!(mm.warteschlange().is_empty());
        assert!(!mm.registry().ist_online(&a));
    }

    #[test]
    fn gebannte_origin_wird_abgewiesen() {
        let mut mm = Matchmaker::neu();
        let ziel = verbunden(&mut mm, "6.6.6.6");
        let partner = verbunden(&mut mm, "7.7.7.7");
        mm.partner_anfordern(ziel);
        mm.partner_anfordern(partner);

        let ausgaenge = mm.bannen_und_entfernen(ziel).unwrap();
        assert_eq!(partner_verloren_an(&ausgaenge), vec![partner]);
        let trennungen: Vec<_> = ausgaenge
            .iter()
            .filter(|a| matches!(a, Ausgang::Trennen { client } if *client == ziel))
            .collect();
        assert_eq!(trennungen.len(), 1);
        assert!(mm.bans().ist_gebannt("6.6.6.6"));
        assert_eq!(mm.bans().anzahl(), 1);

        for _ in 0..3 {
            let err = mm.verbinden(ClientId::new(), "6.6.6.6").unwrap_err();
            assert!(matches!(err, SignalingError::Banned(_)));
        }
        assert!(mm.verbinden(ClientId::new(), "7.7.7.8").is_ok());
    }

    #[test]
    fn bann_eines_unbekannten_ziels() {
        let mut mm = Matchmaker::neu();
        let err = mm.bannen_und_entfernen(ClientId::new()).unwrap_err();
        assert!(matches!(err, SignalingError::NotFound(_)));
        assert_eq!(mm.bans().anzahl(), 0);
    }

    #[test]
    fn viele_anfragen_lassen_hoechstens_einen_wartend() {
        let mut mm = Matchmaker::neu();
        let ids: Vec<ClientId> = (0..9)
            .map(|i| verbunden(&mut mm, &format!("10.0.0.{i}")))
            .collect();

        for (i, id) in ids.iter().enumerate() {
            mm.partner_anfordern(*id);
            if i % 3 == 2 {
                mm.trennen(ids[i - 1]);
            }
            invarianten_pruefen(&mm);
        }
        for id in &ids {
            mm.partner_anfordern(*id);
            invarianten_pruefen(&mm);
        }
    }

    #[test]
    fn snapshot_zaehlt_alle_verbundenen() {
        let mut mm = Matchmaker::neu();
        let a = verbunden(&mut mm, "1.1.1.1");
        let b = verbunden(&mut mm, "2.2.2.2");
        mm.partner_anfordern(a);

        let snapshot = mm.snapshot();
        assert_eq!(snapshot.total_online, 2);
        assert_eq!(
            snapshot.sessions.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![a, b]
        );
    }
}
