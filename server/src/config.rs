//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use zufall_core::ZufallError;
use zufall_observability::logging::{log_format_gueltig, log_level_gueltig};
use zufall_signaling::{NetzwerkKonfig, SignalingConfig};

/// Umgebungsvariable, die das Moderator-Passwort ueberschreibt
pub const ENV_MODERATOR_PASSWORT: &str = "ZUFALL_MODERATOR_PASSWORT";

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Moderations-Einstellungen
    pub moderation: ModerationEinstellungen,
    /// Ressourcen-Limits
    pub limits: LimitEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer HTTP/WebSocket
    pub bind_adresse: String,
    /// Port fuer HTTP/WebSocket
    pub port: u16,
    /// CORS-Origins (leer = alle erlaubt)
    pub cors_origins: Vec<String>,
    /// Origin aus `X-Forwarded-For` lesen (nur hinter einem Reverse-Proxy)
    pub proxy_header_vertrauen: bool,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 5000,
            cors_origins: vec![],
            proxy_header_vertrauen: false,
        }
    }
}

/// Moderations-Einstellungen
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationEinstellungen {
    /// Gemeinsames Moderator-Geheimnis (leer = Login deaktiviert)
    pub passwort: String,
    /// Intervall der Presence-Snapshots in Sekunden
    pub snapshot_intervall_sek: u64,
}

impl Default for ModerationEinstellungen {
    fn default() -> Self {
        Self {
            passwort: "admin123".into(),
            snapshot_intervall_sek: 5,
        }
    }
}

impl std::fmt::Debug for ModerationEinstellungen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModerationEinstellungen")
            .field("passwort", &"***")
            .field("snapshot_intervall_sek", &self.snapshot_intervall_sek)
            .finish()
    }
}

/// Ressourcen-Limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitEinstellungen {
    /// Maximale Anzahl gleichzeitiger Verbindungen
    pub max_clients: usize,
    /// Send-Queue-Groesse pro Verbindung
    pub sende_queue_groesse: usize,
    /// Maximale Groesse eingehender Frames in Bytes
    pub max_frame_bytes: usize,
}

impl Default for LimitEinstellungen {
    fn default() -> Self {
        Self {
            max_clients: 1024,
            sende_queue_groesse: 64,
            max_frame_bytes: 64 * 1024,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let mut config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str::<Self>(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };

        if let Ok(passwort) = std::env::var(ENV_MODERATOR_PASSWORT) {
            config.moderation.passwort = passwort;
        }

        Ok(config)
    }

    /// Gibt die vollstaendige Bind-Adresse zurueck
    pub fn bind_adresse(&self) -> zufall_core::Result<SocketAddr> {
        let adresse = format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port);
        adresse
            .parse()
            .map_err(|e| ZufallError::Konfiguration(format!("Ungueltige Bind-Adresse '{adresse}': {e}")))
    }

    /// Prueft die Konfiguration auf unbrauchbare Werte
    pub fn validieren(&self) -> zufall_core::Result<()> {
        self.bind_adresse()?;

        if self.moderation.snapshot_intervall_sek == 0 {
            return Err(ZufallError::Konfiguration(
                "moderation.snapshot_intervall_sek muss groesser 0 sein".into(),
            ));
        }
        if self.limits.max_clients == 0 {
            return Err(ZufallError::Konfiguration(
                "limits.max_clients muss groesser 0 sein".into(),
            ));
        }
        if self.limits.sende_queue_groesse == 0 {
            return Err(ZufallError::Konfiguration(
                "limits.sende_queue_groesse muss groesser 0 sein".into(),
            ));
        }
        if self.limits.max_frame_bytes == 0 {
            return Err(ZufallError::Konfiguration(
                "limits.max_frame_bytes muss groesser 0 sein".into(),
            ));
        }
        if !log_level_gueltig(&self.logging.level) {
            return Err(ZufallError::Konfiguration(format!(
                "Unbekannter Log-Level '{}'",
                self.logging.level
            )));
        }
        if !log_format_gueltig(&self.logging.format) {
            return Err(ZufallError::Konfiguration(format!(
                "Unbekanntes Log-Format '{}'",
                self.logging.format
            )));
        }
        if self.moderation.passwort.is_empty() {
            tracing::warn!("Moderator-Passwort ist leer, Moderator-Login deaktiviert");
        }

        Ok(())
    }

    /// Konfiguration fuer den Signaling-Service
    pub fn signaling_config(&self) -> SignalingConfig {
        SignalingConfig {
            max_clients: self.limits.max_clients,
            sende_queue_groesse: self.limits.sende_queue_groesse,
            max_frame_bytes: self.limits.max_frame_bytes,
            moderator_passwort: self.moderation.passwort.clone(),
            snapshot_intervall: Duration::from_secs(self.moderation.snapshot_intervall_sek),
        }
    }

    /// Netzwerk-Optionen fuer den WebSocket-Server
    pub fn netzwerk_konfig(&self) -> NetzwerkKonfig {
        NetzwerkKonfig {
            cors_origins: self.netzwerk.cors_origins.clone(),
            proxy_header_vertrauen: self.netzwerk.proxy_header_vertrauen,
        }
    }
}
