//! Identifikationstypen fuer Zufall
//!
//! Jede Verbindung bekommt beim Aufbau eine zufaellige, opake `ClientId`.
//! Das Newtype-Pattern verhindert Verwechslungen mit anderen Strings/UUIDs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Client-ID (eine pro Verbindung)
///
/// Wird auf dem Draht als nackter UUID-String serialisiert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Erstellt eine neue zufaellige ClientId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }

    /// Parst eine ClientId aus ihrer Textform (nackte UUID)
    pub fn parse(text: &str) -> Option<Self> {
        Uuid::parse_str(text.trim()).ok().map(Self)
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "client:{}", self.0)
    }
}
