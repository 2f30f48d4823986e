//! Ban-Store – Gesperrte Netzwerk-Herkuenfte
//!
//! Bans gelten pro Origin (IP), nicht pro ClientId, und nur fuer die
//! Laufzeit des Prozesses. Es gibt keinen Entbann-Pfad.

use std::collections::HashSet;

/// Menge gebannter Origins
#[derive(Debug, Default)]
pub struct BanStore {
    origins: HashSet<String>,
}

impl BanStore {
    /// Erstellt einen leeren Ban-Store
    pub fn neu() -> Self {
        Self::default()
    }

    /// Prueft ob eine Origin gebannt ist
    pub fn ist_gebannt(&self, origin: &str) -> bool {
        self.origins.contains(origin)
    }

    /// Bannt eine Origin
    ///
    /// Gibt `true` zurueck wenn die Origin neu hinzugefuegt wurde.
    pub fn bannen(&mut self, origin: impl Into<String>) -> bool {
        let origin = origin.into();
        let neu = self.origins.insert(origin.clone());
        if neu {
            tracing::info!(origin = %origin, "Origin gebannt");
        }
        neu
    }

    /// Anzahl gebannter Origins
    pub fn anzahl(&self) -> usize {
        self.origins.len()
    }
}
