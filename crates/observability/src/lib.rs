//! # zufall-observability
//!
//! Observability-Crate fuer Zufall:
//! - Prometheus-kompatible Metriken (`/metrics`)
//! - Health-Check-Endpunkt (`/health`)
//! - Structured Logging via tracing-subscriber (Text oder JSON)
//! - Request-Timing Middleware

pub mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;

pub use health::{health_router, HealthResponse, HealthState, HealthStatus};
pub use logging::logging_initialisieren;
pub use metrics::{metrics_router, ZufallMetrics};
pub use middleware::{request_timing_layer, timing_middleware};

use axum::Router;

/// Router mit `/metrics` und `/health`
///
/// Die HTTP-Anfragen an beide Endpunkte werden selbst in den Metriken erfasst.
pub fn observability_router(metriken: ZufallMetrics, health: HealthState) -> Router {
    Router::new()
        .merge(metrics_router(metriken.clone()))
        .merge(health_router(health))
        .layer(axum::middleware::from_fn_with_state(
            metriken,
            timing_middleware,
        ))
}
