//! # Collector de Métricas
//! src/metrics/collector.rs
//!
//! Contadores del servidor, actualizados desde el thread de streaming y
//! consultados desde la UI.

use crate::http::StatusCode;
use crate::server::events::ConnectionOutcome;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Collector de métricas thread-safe
#[derive(Debug, Clone)]
pub struct StreamMetrics {
    inner: Arc<Mutex<MetricsData>>,
    start_time: Instant,
}

/// Datos internos de métricas
#[derive(Debug, Default)]
struct MetricsData {
    /// Conexiones aceptadas
    connections: u64,

    /// Respuestas por código de estado
    status_codes: BTreeMap<u16, u64>,

    /// Conexiones por forma de terminar
    outcomes: BTreeMap<&'static str, u64>,

    /// Bytes de contenido enviados (sin contar cabeceras)
    bytes_streamed: u64,

    /// Veces que la fuente se reabrió al llegar a EOF
    loop_restarts: u64,

    /// Errores de accept distintos de timeout
    accept_failures: u64,

    /// Hay una conexión en curso
    active: bool,
}

/// Foto de las métricas, serializable a JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub connections: u64,
    pub active_connection: bool,
    pub status_codes: BTreeMap<u16, u64>,
    pub outcomes: BTreeMap<&'static str, u64>,
    pub bytes_streamed: u64,
    pub loop_restarts: u64,
    pub accept_failures: u64,
}

impl StreamMetrics {
    /// Crea un collector vacío
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsData::default())),
            start_time: Instant::now(),
        }
    }

    fn data(&self) -> MutexGuard<'_, MetricsData> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Una conexión fue aceptada
    pub fn connection_opened(&self) {
        let mut data = self.data();
        data.connections += 1;
        data.active = true;
    }

    /// Una conexión terminó
    pub fn connection_closed(&self, status: Option<StatusCode>, outcome: &ConnectionOutcome, bytes: u64) {
        let mut data = self.data();
        data.active = false;
        data.bytes_streamed += bytes;
        if let Some(status) = status {
            *data.status_codes.entry(status.as_u16()).or_insert(0) += 1;
        }
        *data.outcomes.entry(outcome.label()).or_insert(0) += 1;
    }

    /// La fuente se reabrió para simular stream en vivo
    pub fn loop_restarted(&self) {
        self.data().loop_restarts += 1;
    }

    /// accept() falló
    pub fn accept_failed(&self) {
        self.data().accept_failures += 1;
    }

    /// Foto actual
    pub fn snapshot(&self) -> MetricsSnapshot {
        let data = self.data();
        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            connections: data.connections,
            active_connection: data.active,
            status_codes: data.status_codes.clone(),
            outcomes: data.outcomes.clone(),
            bytes_streamed: data.bytes_streamed,
            loop_restarts: data.loop_restarts,
            accept_failures: data.accept_failures,
        }
    }

    /// Métricas actuales en JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.snapshot()).unwrap_or_else(|e| {
            format!(r#"{{"error": "cannot serialize metrics: {}"}}"#, e)
        })
    }
}

impl Default for StreamMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let metrics = StreamMetrics::new();

        metrics.connection_opened();
        assert!(metrics.snapshot().active_connection);

        metrics.connection_closed(Some(StatusCode::Ok), &ConnectionOutcome::ClientDisconnected, 1000);
        metrics.connection_opened();
        metrics.connection_closed(
            Some(StatusCode::PartialContent),
            &ConnectionOutcome::Stopped,
            500,
        );
        metrics.connection_opened();
        metrics.connection_closed(None, &ConnectionOutcome::Empty, 0);
        metrics.loop_restarted();
        metrics.accept_failed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.connections, 3);
        assert!(!snapshot.active_connection);
        assert_eq!(snapshot.bytes_streamed, 1500);
        assert_eq!(snapshot.status_codes.get(&200), Some(&1));
        assert_eq!(snapshot.status_codes.get(&206), Some(&1));
        assert_eq!(snapshot.outcomes.get("empty"), Some(&1));
        assert_eq!(snapshot.loop_restarts, 1);
        assert_eq!(snapshot.accept_failures, 1);
    }

    #[test]
    fn test_json() {
        let metrics = StreamMetrics::new();
        metrics.connection_opened();
        metrics.connection_closed(
            Some(StatusCode::RangeNotSatisfiable),
            &ConnectionOutcome::Rejected(StatusCode::RangeNotSatisfiable),
            0,
        );

        let value: serde_json::Value = serde_json::from_str(&metrics.to_json()).unwrap();
        assert_eq!(value["connections"], 1);
        assert_eq!(value["status_codes"]["416"], 1);
        assert_eq!(value["outcomes"]["rejected"], 1);
    }

    #[test]
    fn test_clones_share_state() {
        let metrics = StreamMetrics::new();
        let other = metrics.clone();
        other.loop_restarted();
        assert_eq!(metrics.snapshot().loop_restarts, 1);
    }
}
