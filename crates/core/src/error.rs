//! Fehlertypen fuer Zufall
//!
//! Zentraler Fehler-Enum fuer crate-uebergreifende Fehler.
//! Untermodule definieren eigene Fehler und konvertieren bei Bedarf via `#[from]`.

use thiserror::Error;

/// Globaler Result-Alias fuer Zufall
pub type Result<T> = std::result::Result<T, ZufallError>;

/// Crate-uebergreifende Fehler
#[derive(Debug, Error)]
pub enum ZufallError {
    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl ZufallError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = ZufallError::Konfiguration("Port fehlt".into());
        assert_eq!(e.to_string(), "Konfigurationsfehler: Port fehlt");
    }

    #[test]
    fn intern_konstruktor() {
        let e = ZufallError::intern("kaputt");
        assert!(matches!(e, ZufallError::Intern(ref m) if m == "kaputt"));
    }
}
