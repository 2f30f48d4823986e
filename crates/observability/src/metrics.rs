//! Prometheus-kompatible Metriken fuer Zufall
//!
//! Registrierte Metriken:
//! - `zufall_online_clients` – Gauge: Aktuell verbundene Clients
//! - `zufall_wartende_clients` – Gauge: Clients in der Warteschlange
//! - `zufall_aktive_paare` – Gauge: Aktuell gepaarte Sessions
//! - `zufall_paarungen_total` – Counter: Erstellte Paarungen
//! - `zufall_signale_total` – Counter: Weitergeleitete Signal-Payloads
//! - `zufall_chat_total` – Counter: Weitergeleitete Chat-Nachrichten
//! - `zufall_bans_total` – Counter: Ausgefuehrte Bans
//! - `zufall_abgelehnte_verbindungen_total` – Counter: Abgewiesene Verbindungen
//! - `zufall_http_requests_total` – Counter: HTTP-Anfragen (method, path, status)
//! - `zufall_http_request_duration_seconds` – Histogram: HTTP-Antwortzeit

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Alle Zufall-Prometheus-Metriken
///
/// Clone teilt die Registry und alle Metrik-Handles.
#[derive(Clone)]
pub struct ZufallMetrics {
    pub registry: Arc<Registry>,

    // Matchmaking
    pub online_clients: IntGauge,
    pub wartende_clients: IntGauge,
    pub aktive_paare: IntGauge,
    pub paarungen_total: IntCounter,
    pub signale_total: IntCounter,
    pub chat_total: IntCounter,
    pub bans_total: IntCounter,
    pub abgelehnte_verbindungen_total: IntCounter,

    // HTTP
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
}

fn gauge(registry: &Registry, name: &str, hilfe: &str) -> Result<IntGauge> {
    let gauge = IntGauge::with_opts(Opts::new(name, hilfe))?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

fn counter(registry: &Registry, name: &str, hilfe: &str) -> Result<IntCounter> {
    let counter = IntCounter::with_opts(Opts::new(name, hilfe))?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

impl ZufallMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        // --- Matchmaking ---
        let online_clients = gauge(
            &registry,
            "zufall_online_clients",
            "Anzahl aktuell verbundener Clients",
        )?;
        let wartende_clients = gauge(
            &registry,
            "zufall_wartende_clients",
            "Anzahl Clients in der Warteschlange",
        )?;
        let aktive_paare = gauge(&registry, "zufall_aktive_paare", "Anzahl aktiver Paare")?;
        let paarungen_total = counter(
            &registry,
            "zufall_paarungen_total",
            "Gesamtanzahl erstellter Paarungen",
        )?;
        let signale_total = counter(
            &registry,
            "zufall_signale_total",
            "Gesamtanzahl weitergeleiteter Signal-Payloads",
        )?;
        let chat_total = counter(
            &registry,
            "zufall_chat_total",
            "Gesamtanzahl weitergeleiteter Chat-Nachrichten",
        )?;
        let bans_total = counter(&registry, "zufall_bans_total", "Gesamtanzahl Bans")?;
        let abgelehnte_verbindungen_total = counter(
            &registry,
            "zufall_abgelehnte_verbindungen_total",
            "Abgewiesene Verbindungen (Ban oder Server voll)",
        )?;

        // --- HTTP ---
        let http_requests_total = IntCounterVec::new(
            Opts::new("zufall_http_requests_total", "Gesamtanzahl HTTP-Anfragen"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "zufall_http_request_duration_seconds",
                "HTTP-Antwortzeit in Sekunden",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
            &["method", "path"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            online_clients,
            wartende_clients,
            aktive_paare,
            paarungen_total,
            signale_total,
            chat_total,
            bans_total,
            abgelehnte_verbindungen_total,
            http_requests_total,
            http_request_duration_seconds,
        })
    }

    /// Setzt die Matchmaking-Gauges auf einen Schlag
    pub fn zustand_setzen(&self, online: usize, wartend: usize, paare: usize) {
        self.online_clients.set(online as i64);
        self.wartende_clients.set(wartend as i64);
        self.aktive_paare.set(paare as i64);
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: ZufallMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<ZufallMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
