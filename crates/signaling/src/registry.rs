//! Connection-Registry – Wer ist verbunden, von wo, mit wem gepaart
//!
//! Die Registry besitzt alle `ClientSession`-Eintraege exklusiv. Die
//! Warteschlange haelt nur ClientIds, nie Kopien veraenderlicher Felder.
//!
//! Die Registry ist nicht selbst synchronisiert: sie lebt im `Matchmaker`
//! hinter dem einen Mutex des `SignalingState`.

use std::collections::HashMap;
use std::time::Instant;

use zufall_core::types::ClientId;
use zufall_protocol::control::SessionInfo;

use crate::error::{SignalingError, SignalingResult};

// ---------------------------------------------------------------------------
// PresenceState
// ---------------------------------------------------------------------------

/// Paarungszustand eines Clients
///
/// ```text
/// Idle -> Queued -> Paired -> Idle | Queued
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    /// Verbunden, weder wartend noch gepaart
    Idle,
    /// In der Warteschlange
    Queued,
    /// Gepaart; `initiator` startet den Handshake
    Paired { partner: ClientId, initiator: bool },
}

impl PresenceState {
    /// Partner falls gepaart
    pub fn partner(&self) -> Option<ClientId> {
        match self {
            PresenceState::Paired { partner, .. } => Some(*partner),
            _ => None,
        }
    }

    /// Darf dieser Client gepaart werden?
    pub fn ist_paarbar(&self) -> bool {
        matches!(self, PresenceState::Idle | PresenceState::Queued)
    }
}

// ---------------------------------------------------------------------------
// ClientSession
// ---------------------------------------------------------------------------

/// Eintrag eines verbundenen Clients
#[derive(Debug, Clone)]
pub struct ClientSession {
    pub id: ClientId,
    /// Netzwerk-Herkunft (IP), Grundlage fuer Bans
    pub origin: String,
    pub zustand: PresenceState,
    pub verbunden_seit: Instant,
    /// Aufnahme-Reihenfolge, bestimmt die Sortierung im Snapshot
    aufnahme_nr: u64,
}

impl ClientSession {
    /// Partner falls gepaart
    pub fn partner(&self) -> Option<ClientId> {
        self.zustand.partner()
    }
}

// ---------------------------------------------------------------------------
// ConnectionRegistry
// ---------------------------------------------------------------------------

/// Autoritative Zuordnung ClientId -> Session
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: HashMap<ClientId, ClientSession>,
    naechste_nr: u64,
}

impl ConnectionRegistry {
    /// Erstellt eine leere Registry
    pub fn neu() -> Self {
        Self::default()
    }

    /// Nimmt einen neuen Client im Zustand `Idle` auf
    pub fn aufnehmen(&mut self, id: ClientId, origin: impl Into<String>) -> SignalingResult<&ClientSession> {
        if self.sessions.contains_key(&id) {
            return Err(SignalingError::DuplicateIdentity(id));
        }

        let nr = self.naechste_nr;
        self.naechste_nr += 1;

        let session = self.sessions.entry(id).or_insert(ClientSession {
            id,
            origin: origin.into(),
            zustand: PresenceState::Idle,
            verbunden_seit: Instant::now(),
            aufnahme_nr: nr,
        });
        Ok(session)
    }

    /// Sucht einen Client
    pub fn nachschlagen(&self, id: &ClientId) -> SignalingResult<&ClientSession> {
        self.sessions.get(id).ok_or(SignalingError::NotFound(*id))
    }

    /// Entfernt einen Client (idempotent)
    pub fn entfernen(&mut self, id: &ClientId) -> Option<ClientSession> {
        self.sessions.remove(id)
    }

    /// Setzt oder loescht den Partner eines Clients
    ///
    /// `Some` setzt `Paired`, `None` setzt `Idle`.
    pub fn partner_setzen(
        &mut self,
        id: &ClientId,
        partner: Option<(ClientId, bool)>,
    ) -> SignalingResult<()> {
        let zustand = match partner {
            Some((partner, initiator)) => PresenceState::Paired { partner, initiator },
            None => PresenceState::Idle,
        };
        self.zustand_setzen(id, zustand)
    }

    /// Setzt den Zustand eines Clients
    pub fn zustand_setzen(&mut self, id: &ClientId, zustand: PresenceState) -> SignalingResult<()> {
        let session = self
            .sessions
            .get_mut(id)
            .ok_or(SignalingError::NotFound(*id))?;
        session.zustand = zustand;
        Ok(())
    }

    /// Aktueller Zustand, `None` wenn nicht registriert
    pub fn zustand(&self, id: &ClientId) -> Option<PresenceState> {
        self.sessions.get(id).map(|s| s.zustand)
    }

    /// Ist der Client registriert und paarbar (`Idle`/`Queued`)?
    pub fn ist_paarbar(&self, id: &ClientId) -> bool {
        self.sessions
            .get(id)
            .is_some_and(|s| s.zustand.ist_paarbar())
    }

    /// Prueft ob ein Client registriert ist
    pub fn ist_online(&self, id: &ClientId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Anzahl registrierter Clients
    pub fn anzahl(&self) -> usize {
        self.sessions.len()
    }

    /// Anzahl gepaarter Clients
    pub fn gepaart_anzahl(&self) -> usize {
        self.sessions
            .values()
            .filter(|s| matches!(s.zustand, PresenceState::Paired { .. }))
            .count()
    }

    /// Alle Clients als (id, origin), in Aufnahme-Reihenfolge
    ///
    /// Konsistent solange der Aufrufer den Matchmaker-Lock haelt.
    pub fn snapshot(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<&ClientSession> = self.sessions.values().collect();
        sessions.sort_by_key(|s| s.aufnahme_nr);
        sessions
            .into_iter()
            .map(|s| SessionInfo {
                id: s.id,
                ip: s.origin.clone(),
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

    #[test]
    fn aufnehmen_und_entfernen() {
        let mut registry = ConnectionRegistry::neu();
        let id = ClientId::new();

        let session = registry.aufnehmen(id, "10.0.0.1").unwrap();
        assert_eq!(session.zustand, PresenceState::Idle);
        assert_eq!(session.origin, "10.0.0.1");
        assert!(registry.ist_online(&id));
        assert_eq!(registry.anzahl(), 1);

        assert!(registry.entfernen(&id).is_some());
        assert!(!registry.ist_online(&id));
        // Idempotent
        assert!(registry.entfernen(&id).is_none());
    }

    #[test]
    fn doppelte_identitaet_wird_abgelehnt() {
        let mut registry = ConnectionRegistry::neu();
        let id = ClientId::new();

        registry.aufnehmen(id, "10.0.0.1").unwrap();
        let err = registry.aufnehmen(id, "10.0.0.2").unwrap_err();
        assert!(matches!(err, SignalingError::DuplicateIdentity(x) if x == id));
        // Original bleibt unveraendert
        assert_eq!(registry.nachschlagen(&id).unwrap().origin, "10.0.0.1");
    }

    #[test]
    fn nachschlagen_unbekannt() {
        let registry = ConnectionRegistry::neu();
        let id = ClientId::new();
        assert!(matches!(
            registry.nachschlagen(&id),
            Err(SignalingError::NotFound(x)) if x == id
        ));
    }

    #[test]
    fn partner_setzen_und_loeschen() {
        let mut registry = ConnectionRegistry::neu();
        let a = ClientId::new();
        let b = ClientId::new();
        registry.aufnehmen(a, "1.1.1.1").unwrap();
        registry.aufnehmen(b, "2.2.2.2").unwrap();

        registry.partner_setzen(&a, Some((b, true))).unwrap();
        assert_eq!(registry.nachschlagen(&a).unwrap().partner(), Some(b));
        assert!(!registry.ist_paarbar(&a));
        assert_eq!(registry.gepaart_anzahl(), 1);

        registry.partner_setzen(&a, None).unwrap();
        assert_eq!(registry.zustand(&a), Some(PresenceState::Idle));
        assert!(registry.ist_paarbar(&a));

        let fremd = ClientId::new();
        assert!(registry.partner_setzen(&fremd, None).is_err());
    }

    #[test]
    fn snapshot_in_aufnahme_reihenfolge() {
        let mut registry = ConnectionRegistry::neu();
        let ids: Vec<ClientId> = (0..5).map(|_| ClientId::new()).collect();
        for (i, id) in ids.iter().enumerate() {
            registry.aufnehmen(*id, format!("10.0.0.{i}")).unwrap();
        }
        registry.entfernen(&ids[2]);

        let snapshot = registry.snapshot();
        let erwartet: Vec<ClientId> = vec![ids[0], ids[1], ids[3], ids[4]];
        assert_eq!(snapshot.iter().map(|s| s.id).collect::<Vec<_>>(), erwartet);
        assert_eq!(snapshot[2].ip, "10.0.0.3");
    }
}
