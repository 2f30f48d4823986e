//! Matchmaking-Warteschlange
//!
//! Strikte FIFO-Reihenfolge ohne Duplikate. Die Paarung laeuft solange
//! mindestens zwei Eintraege warten.

use std::collections::VecDeque;

use zufall_core::types::ClientId;

use crate::registry::{ConnectionRegistry, PresenceState};

// ---------------------------------------------------------------------------
// WaitQueue
// ---------------------------------------------------------------------------

/// Geordnete Liste wartender ClientIds
#[derive(Debug, Default)]
pub struct WaitQueue {
    eintraege: VecDeque<ClientId>,
}

impl WaitQueue {
    /// Erstellt eine leere Warteschlange
    pub fn neu() -> Self {
        Self::default()
    }

    /// Haengt einen Client hinten an
    ///
    /// Gibt `false` zurueck wenn er bereits wartet.
    pub fn einreihen(&mut self, id: ClientId) -> bool {
        if self.enthaelt(&id) {
            return false;
        }
        self.eintraege.push_back(id);
        true
    }

    /// Entfernt einen Client an beliebiger Position
    pub fn entfernen_falls_vorhanden(&mut self, id: &ClientId) -> bool {
        match self.eintraege.iter().position(|e| e == id) {
            Some(pos) => {
                self.eintraege.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn enthaelt(&self, id: &ClientId) -> bool {
        self.eintraege.contains(id)
    }

    pub fn len(&self) -> usize {
        self.eintraege.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eintraege.is_empty()
    }

    /// Wartende in Reihenfolge
    pub fn ids(&self) -> Vec<ClientId> {
        self.eintraege.iter().copied().collect()
    }

    fn vorne_entnehmen(&mut self) -> Option<ClientId> {
        self.eintraege.pop_front()
    }

    fn vorne_einfuegen(&mut self, id: ClientId) {
        self.eintraege.push_front(id);
    }
}

// ---------------------------------------------------------------------------
// Paarung
// ---------------------------------------------------------------------------

/// Ergebnis einer erfolgreichen Paarung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paarung {
    /// Laenger wartender Client, startet den Handshake
    pub initiator: ClientId,
    pub partner: ClientId,
}

/// Leert die Warteschlange paarweise
///
/// Entnimmt jeweils die zwei aeltesten Eintraege. Sind beide noch paarbar,
/// werden sie gegenseitig als `Paired` markiert. Sonst wird der tote Eintrag
/// verworfen und der lebende wieder vorne eingereiht.
pub fn paaren(warteschlange: &mut WaitQueue, registry: &mut ConnectionRegistry) -> Vec<Paarung> {
    let mut paarungen = Vec::new();

    while warteschlange.len() >= 2 {
        let (Some(erster), Some(zweiter)) =
            (warteschlange.vorne_entnehmen(), warteschlange.vorne_entnehmen())
        else {
            break;
        };

        let erster_lebt = registry.ist_paarbar(&erster);
        let zweiter_lebt = registry.ist_paarbar(&zweiter);

        match (erster_lebt, zweiter_lebt) {
            (true, true) => {
                let gesetzt = registry
                    .zustand_setzen(
                        &erster,
                        PresenceState::Paired {
                            partner: zweiter,
                            initiator: true,
                        },
                    )
                    .and_then(|_| {
                        registry.zustand_setzen(
                            &zweiter,
                            PresenceState::Paired {
                                partner: erster,
                                initiator: false,
                            },
                        )
                    });
                if gesetzt.is_err() {
                    // Nicht erreichbar: beide wurden eben als paarbar geprueft
                    tracing::warn!(erster = %erster, zweiter = %zweiter, "Paarung fehlgeschlagen");
                    continue;
                }

                paarungen.push(Paarung {
                    initiator: erster,
                    partner: zweiter,
                });
            }
            (true, false) => {
                tracing::debug!(verworfen = %zweiter, "Toter Eintrag in Warteschlange verworfen");
                warteschlange.vorne_einfuegen(erster);
            }
            (false, true) => {
                tracing::debug!(verworfen = %erster, "Toter Eintrag in Warteschlange verworfen");
                warteschlange.vorne_einfuegen(zweiter);
            }
            (false, false) => {
                tracing::debug!(erster = %erster, zweiter = %zweiter, "Zwei tote Eintraege verworfen");
            }
        }
    }

    paarungen
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
