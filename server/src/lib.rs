//! zufall-server – Bibliotheks-Root
//!
//! Verdrahtet Konfiguration, Signaling-State, Snapshot-Task und
//! WebSocket-Server und stellt den Einstiegspunkt fuer Integrationstests
//! bereit.

pub mod config;

use anyhow::Result;
use config::ServerConfig;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use zufall_core::ZufallError;
use zufall_observability::{HealthState, ZufallMetrics};
use zufall_signaling::{snapshot_task_starten, SignalingServer, SignalingState};

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Subsysteme und laeuft bis Ctrl-C
    pub async fn starten(self) -> Result<()> {
        let adresse = self.config.bind_adresse()?;
        let listener = TcpListener::bind(adresse).await?;

        self.mit_listener(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(fehler = %e, "Ctrl-C-Handler konnte nicht registriert werden");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
        })
        .await
    }

    /// Bedient einen bereits gebundenen Listener bis `shutdown` abschliesst
    ///
    /// Reihenfolge:
    /// 1. Konfiguration pruefen
    /// 2. Metriken und Signaling-State erstellen
    /// 3. Snapshot-Task starten
    /// 4. WebSocket-Server bedienen
    /// 5. Bei Shutdown: Health auf `unhealthy`, Verbindungen und Tasks beenden
    pub async fn mit_listener<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.config.validieren()?;

        let metriken = ZufallMetrics::neu()?;
        let state = SignalingState::neu(self.config.signaling_config(), metriken);
        let health = HealthState::mit_startzeit(state.start_time);

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        let snapshot_task = snapshot_task_starten(
            Arc::clone(&state),
            state.config.snapshot_intervall,
            shutdown_rx.clone(),
        );

        let health_shutdown = health.clone();
        tokio::spawn(async move {
            shutdown.await;
            health_shutdown.herunterfahren_markieren();
            let _ = shutdown_tx.send(true);
        });

        tracing::info!(
            adresse = %listener.local_addr()?,
            max_clients = state.config.max_clients,
            snapshot_intervall_sek = state.config.snapshot_intervall.as_secs(),
            moderation_aktiv = !self.config.moderation.passwort.is_empty(),
            "Server startet"
        );

        let server = SignalingServer::neu(
            Arc::clone(&state),
            self.config.netzwerk_konfig(),
            health,
        );
        server.bedienen(listener, shutdown_rx).await?;

        snapshot_task
            .await
            .map_err(|e| ZufallError::intern(format!("Snapshot-Task abgebrochen: {e}")))?;

        tracing::info!(uptime_sek = state.uptime_sek(), "Server beendet");
        Ok(())
    }
}
